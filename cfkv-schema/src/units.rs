//! Conversion of unit expressions to the base units eV, Å, GPa and e.
//!
//! Expressions are a numerator followed by optional `/`-separated
//! denominators; each term is a `*`-separated product of `unit` or
//! `unit^n` factors (`eV/Ang`, `Hartree/Bohr`, `eV/Ang^3`, `kcal/mol`).
//! The factor of a compound expression is the product of its parts, so
//! `eV/Ang^3` stays in eV/Å^3 rather than being turned into a pressure.

use cfkv_result::{Error, Result};

/// Resolves a unit expression to the multiplier taking values into base
/// units.
pub trait UnitConverter: Send + Sync + 'static {
    fn factor(&self, unit: &str) -> Result<f64>;
}

/// Whole-expression entries checked before compound parsing.
const NAMED: &[(&str, f64)] = &[
    ("kcal/mol", 0.043_364_104_3),
    ("kJ/mol", 0.010_364_269_9),
];

const ATOMS: &[(&str, f64)] = &[
    // energy
    ("eV", 1.0),
    ("meV", 1.0e-3),
    ("keV", 1.0e3),
    ("Hartree", 27.211_386_245_988),
    ("hartree", 27.211_386_245_988),
    ("Ha", 27.211_386_245_988),
    ("Ry", 13.605_693_122_994),
    ("Rydberg", 13.605_693_122_994),
    ("kcal", 2.611447e22),
    ("kJ", 6.241509074e21),
    ("J", 6.241509074e18),
    // length
    ("Ang", 1.0),
    ("ang", 1.0),
    ("angstrom", 1.0),
    ("Angstrom", 1.0),
    ("\u{c5}", 1.0),
    ("Bohr", 0.529_177_210_903),
    ("bohr", 0.529_177_210_903),
    ("nm", 10.0),
    ("pm", 0.01),
    ("m", 1.0e10),
    // pressure
    ("GPa", 1.0),
    ("MPa", 1.0e-3),
    ("kPa", 1.0e-6),
    ("Pa", 1.0e-9),
    ("pascal", 1.0e-9),
    ("bar", 1.0e-4),
    ("kbar", 0.1),
    ("kilobar", 0.1),
    ("atm", 1.01325e-4),
    // charge
    ("e", 1.0),
    ("C", 6.241509074e18),
    // amount
    ("mol", 6.022_140_76e23),
];

/// The built-in conversion table.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardUnits;

impl StandardUnits {
    fn atom(name: &str) -> Option<f64> {
        ATOMS.iter().find(|(n, _)| *n == name).map(|(_, f)| *f)
    }

    fn term(expr: &str, term: &str) -> Result<f64> {
        let mut product = 1.0;
        for factor in term.split('*') {
            let factor = factor.trim();
            let (name, power) = match factor.split_once('^') {
                Some((name, p)) => {
                    let p: i32 = p
                        .trim()
                        .parse()
                        .map_err(|_| Error::UnknownUnit(expr.to_string()))?;
                    (name.trim(), p)
                }
                None => (factor, 1),
            };
            let base = Self::atom(name).ok_or_else(|| Error::UnknownUnit(expr.to_string()))?;
            product *= base.powi(power);
        }
        Ok(product)
    }
}

impl UnitConverter for StandardUnits {
    fn factor(&self, unit: &str) -> Result<f64> {
        let unit = unit.trim();
        if let Some((_, f)) = NAMED.iter().find(|(n, _)| *n == unit) {
            return Ok(*f);
        }
        if unit.is_empty() {
            return Err(Error::UnknownUnit(String::new()));
        }
        let mut terms = unit.split('/');
        let numerator = terms.next().unwrap_or_default();
        let mut factor = Self::term(unit, numerator)?;
        for denominator in terms {
            factor /= Self::term(unit, denominator)?;
        }
        Ok(factor)
    }
}
