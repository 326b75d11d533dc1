//! Array-store field paths.
//!
//! Paths are `<collection>/<info|arrays>/<field>` for configurations and
//! `properties/<definition>/<field>` for property values.

pub const ATOMIC_NUMBERS: &str = "configurations/arrays/atomic_numbers";
pub const POSITIONS: &str = "configurations/arrays/positions";
pub const CELL: &str = "configurations/info/cell";
pub const PBC: &str = "configurations/info/pbc";

/// The fields every configuration stores.
pub const STANDARD_CONFIGURATION_FIELDS: [&str; 4] = [ATOMIC_NUMBERS, POSITIONS, CELL, PBC];

pub fn property_field(definition: &str, field: &str) -> String {
    format!("properties/{definition}/{field}")
}

/// Path of a per-structure attribute from `AtomicStructure::info`.
pub fn configuration_info(key: &str) -> String {
    format!("configurations/info/{key}")
}

/// Path of a per-atom attribute from `AtomicStructure::arrays`.
pub fn configuration_array(key: &str) -> String {
    format!("configurations/arrays/{key}")
}

/// True for the paths holding a configuration's identity fields.
pub fn is_standard_field(path: &str) -> bool {
    STANDARD_CONFIGURATION_FIELDS.contains(&path)
}
