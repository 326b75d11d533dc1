//! Content hashing for cfkv.
//!
//! Identity is derived from a canonical byte encoding of each entity's
//! intrinsic fields, fed to an injectable [`ContentHasher`]. The production
//! strategy is [`Sha512Hasher`]; tests may inject [`SmallWidthHasher`] to get
//! deterministic, deliberately narrow IDs.
//!
//! Collisions are not detected. Two distinct entities that hash to the same
//! ID are treated as the same record; the 64-bit digest width makes this an
//! assumption, not a guarantee.

pub mod canonical;
pub mod hasher;
pub mod identity;

pub use canonical::CanonicalEncoder;
pub use hasher::{ContentHasher, EntityKind, HASH_SHIFT, Sha512Hasher, SmallWidthHasher};
pub use identity::{ContentIdentity, SettingsFileRef};
