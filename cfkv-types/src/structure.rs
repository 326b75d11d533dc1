//! The normalized atomic-structure object accepted by the insertion API.

use crate::composition::Composition;
use crate::elements;
use crate::ndarray::NdArray;
use cfkv_result::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};

/// One atomic structure plus free-form attributes.
///
/// `atomic_numbers`, `positions`, `cell` and `pbc` define the structure's
/// identity. `names` and `labels` are descriptive and merged on re-insertion.
/// `info` holds per-structure attributes and `arrays` per-atom attributes
/// (leading extent equal to the atom count); both are the raw source that
/// property field maps read from.
#[derive(Clone, Debug, PartialEq)]
pub struct AtomicStructure {
    pub atomic_numbers: Vec<u8>,
    pub positions: Vec<[f64; 3]>,
    pub cell: [[f64; 3]; 3],
    pub pbc: [bool; 3],
    pub names: BTreeSet<String>,
    pub labels: BTreeSet<String>,
    pub info: BTreeMap<String, NdArray>,
    pub arrays: BTreeMap<String, NdArray>,
}

impl AtomicStructure {
    pub fn new(
        atomic_numbers: Vec<u8>,
        positions: Vec<[f64; 3]>,
        cell: [[f64; 3]; 3],
        pbc: [bool; 3],
    ) -> Result<Self> {
        if atomic_numbers.len() != positions.len() {
            return Err(Error::InvalidArgumentError(format!(
                "{} atomic numbers but {} positions",
                atomic_numbers.len(),
                positions.len()
            )));
        }
        if let Some(&bad) = atomic_numbers
            .iter()
            .find(|&&z| elements::symbol(z).is_none())
        {
            return Err(Error::InvalidArgumentError(format!(
                "invalid atomic number {bad}"
            )));
        }
        Ok(Self {
            atomic_numbers,
            positions,
            cell,
            pbc,
            names: BTreeSet::new(),
            labels: BTreeSet::new(),
            info: BTreeMap::new(),
            arrays: BTreeMap::new(),
        })
    }

    /// Builds a non-periodic structure with a zero cell from chemical symbols.
    pub fn from_symbols(symbols: &[&str], positions: Vec<[f64; 3]>) -> Result<Self> {
        let atomic_numbers = symbols
            .iter()
            .map(|s| {
                elements::atomic_number(s).ok_or_else(|| {
                    Error::InvalidArgumentError(format!("unknown chemical symbol '{s}'"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(atomic_numbers, positions, [[0.0; 3]; 3], [false; 3])
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.names.insert(name.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.insert(label.into());
        self
    }

    pub fn with_info(mut self, key: impl Into<String>, value: NdArray) -> Self {
        self.info.insert(key.into(), value);
        self
    }

    /// Adds a per-atom attribute; its leading extent must equal `natoms()`.
    pub fn with_array(mut self, key: impl Into<String>, value: NdArray) -> Result<Self> {
        let key = key.into();
        if value.is_scalar() || value.leading_extent() != self.natoms() {
            return Err(Error::InvalidArgumentError(format!(
                "per-atom array '{key}' has shape {:?} for {} atoms",
                value.shape(),
                self.natoms()
            )));
        }
        self.arrays.insert(key, value);
        Ok(self)
    }

    #[inline]
    pub fn natoms(&self) -> usize {
        self.atomic_numbers.len()
    }

    /// Looks up a raw attribute, preferring `info` over `arrays`.
    pub fn attribute(&self, key: &str) -> Option<&NdArray> {
        self.info.get(key).or_else(|| self.arrays.get(key))
    }

    pub fn symbols(&self) -> Vec<&'static str> {
        self.atomic_numbers
            .iter()
            .filter_map(|&z| elements::symbol(z))
            .collect()
    }

    pub fn composition(&self) -> Result<Composition> {
        Composition::from_atomic_numbers(&self.atomic_numbers)
    }

    /// Number of periodic directions.
    #[inline]
    pub fn nperiodic_dimensions(&self) -> u8 {
        self.pbc.iter().filter(|&&p| p).count() as u8
    }

    /// True when the identity-defining fields match.
    pub fn same_structure(&self, other: &Self) -> bool {
        self.atomic_numbers == other.atomic_numbers
            && self.positions == other.positions
            && self.cell == other.cell
            && self.pbc == other.pbc
    }
}
