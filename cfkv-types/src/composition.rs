//! Element composition and chemical formulas of one structure.
//!
//! Formula conventions:
//! - reduced: elements alphabetical, counts divided by their gcd, `1` omitted
//! - anonymous: gcd-reduced counts sorted descending, labelled `A`..`Z`,
//!   then `Aa`..`Za`, `Ab`.. ; `1` omitted
//! - Hill: `C` then `H` then the rest alphabetical when carbon is present,
//!   otherwise everything alphabetical; raw counts

use crate::elements;
use cfkv_result::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Composition {
    /// Element symbols, sorted alphabetically.
    pub elements: Vec<String>,
    /// Site count per entry of `elements`.
    pub counts: Vec<u64>,
    pub nsites: u64,
}

impl Composition {
    pub fn from_atomic_numbers(atomic_numbers: &[u8]) -> Result<Self> {
        let mut tally: BTreeMap<&'static str, u64> = BTreeMap::new();
        for &z in atomic_numbers {
            let sym = elements::symbol(z).ok_or_else(|| {
                Error::InvalidArgumentError(format!("invalid atomic number {z}"))
            })?;
            *tally.entry(sym).or_default() += 1;
        }
        let (elements, counts) = tally
            .into_iter()
            .map(|(sym, n)| (sym.to_string(), n))
            .unzip();
        Ok(Self {
            elements,
            counts,
            nsites: atomic_numbers.len() as u64,
        })
    }

    #[inline]
    pub fn nelements(&self) -> usize {
        self.elements.len()
    }

    /// Fraction of sites per element, parallel to `elements`.
    pub fn elements_ratios(&self) -> Vec<f64> {
        if self.nsites == 0 {
            return Vec::new();
        }
        self.counts
            .iter()
            .map(|&c| c as f64 / self.nsites as f64)
            .collect()
    }

    pub fn reduced_formula(&self) -> String {
        let g = self.counts_gcd();
        let mut out = String::new();
        for (sym, &c) in self.elements.iter().zip(&self.counts) {
            push_term(&mut out, sym, c / g);
        }
        out
    }

    pub fn anonymous_formula(&self) -> String {
        let g = self.counts_gcd();
        let mut reduced: Vec<u64> = self.counts.iter().map(|&c| c / g).collect();
        reduced.sort_unstable_by(|a, b| b.cmp(a));
        let mut out = String::new();
        for (i, c) in reduced.into_iter().enumerate() {
            push_term(&mut out, &anonymous_symbol(i), c);
        }
        out
    }

    pub fn hill_formula(&self) -> String {
        let mut out = String::new();
        let has_carbon = self.elements.iter().any(|e| e == "C");
        let lookup = |sym: &str| {
            self.elements
                .iter()
                .position(|e| e == sym)
                .map(|i| self.counts[i])
        };
        if has_carbon {
            for sym in ["C", "H"] {
                if let Some(c) = lookup(sym) {
                    push_term(&mut out, sym, c);
                }
            }
        }
        for (sym, &c) in self.elements.iter().zip(&self.counts) {
            if has_carbon && (sym == "C" || sym == "H") {
                continue;
            }
            push_term(&mut out, sym, c);
        }
        out
    }

    fn counts_gcd(&self) -> u64 {
        self.counts.iter().copied().fold(0, gcd).max(1)
    }
}

fn push_term(out: &mut String, sym: &str, count: u64) {
    out.push_str(sym);
    if count != 1 {
        out.push_str(&count.to_string());
    }
}

fn anonymous_symbol(i: usize) -> String {
    let mut s = String::with_capacity(2);
    s.push((b'A' + (i % 26) as u8) as char);
    let cycle = i / 26;
    if cycle > 0 {
        s.push((b'a' + ((cycle - 1) % 26) as u8) as char);
    }
    s
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 { a } else { gcd(b, a % b) }
}
