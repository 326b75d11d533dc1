use rustc_hash::FxHasher;
use sha2::{Digest, Sha512};
use std::hash::Hasher;

/// Subtracted from the raw 64-bit digest so IDs span the signed range.
pub const HASH_SHIFT: u64 = 1 << 63;

/// Entity family being hashed. Prefixed to the canonical bytes so different
/// kinds never share an ID.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Configuration,
    Property,
    PropertySettings,
    ConfigurationSet,
    Dataset,
}

impl EntityKind {
    pub fn tag(self) -> &'static [u8] {
        match self {
            EntityKind::Configuration => b"configuration",
            EntityKind::Property => b"property",
            EntityKind::PropertySettings => b"property-settings",
            EntityKind::ConfigurationSet => b"configuration-set",
            EntityKind::Dataset => b"dataset",
        }
    }
}

/// Strategy mapping canonical bytes to a signed 64-bit identifier.
///
/// Implementations must be pure: equal `(kind, canonical)` inputs always map
/// to the same output, across processes and runs.
pub trait ContentHasher: Send + Sync + 'static {
    fn hash(&self, kind: EntityKind, canonical: &[u8]) -> i64;
}

/// SHA-512, truncated to the first 8 bytes and shifted into the signed range.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha512Hasher;

impl ContentHasher for Sha512Hasher {
    fn hash(&self, kind: EntityKind, canonical: &[u8]) -> i64 {
        let digest = Sha512::new()
            .chain_update(kind.tag())
            .chain_update(canonical)
            .finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(head).wrapping_sub(HASH_SHIFT) as i64
    }
}

/// Narrow deterministic hasher for tests. Keeps only the low `bits` bits of
/// an Fx hash, so collisions are easy to provoke on purpose.
#[derive(Clone, Copy, Debug)]
pub struct SmallWidthHasher {
    bits: u32,
}

impl SmallWidthHasher {
    /// `bits` is clamped to `1..=63`.
    pub fn new(bits: u32) -> Self {
        Self {
            bits: bits.clamp(1, 63),
        }
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }
}

impl ContentHasher for SmallWidthHasher {
    fn hash(&self, kind: EntityKind, canonical: &[u8]) -> i64 {
        let mut h = FxHasher::default();
        h.write(kind.tag());
        h.write(canonical);
        (h.finish() & ((1u64 << self.bits) - 1)) as i64
    }
}
