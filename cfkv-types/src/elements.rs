//! Periodic table lookups.

/// Chemical symbols indexed by atomic number. Index 0 is the placeholder `X`.
pub const SYMBOLS: [&str; 119] = [
    "X", "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S",
    "Cl", "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge",
    "As", "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd",
    "In", "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd",
    "Tb", "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg",
    "Tl", "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm",
    "Bk", "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn",
    "Nh", "Fl", "Mc", "Lv", "Ts", "Og",
];

/// Largest supported atomic number.
pub const MAX_ATOMIC_NUMBER: u8 = 118;

/// Symbol for atomic number `z`, or `None` outside `1..=118`.
#[inline]
pub fn symbol(z: u8) -> Option<&'static str> {
    if z == 0 || z > MAX_ATOMIC_NUMBER {
        return None;
    }
    Some(SYMBOLS[z as usize])
}

/// Atomic number for a chemical symbol (case-sensitive).
pub fn atomic_number(sym: &str) -> Option<u8> {
    SYMBOLS
        .iter()
        .skip(1)
        .position(|s| *s == sym)
        .map(|i| (i + 1) as u8)
}
