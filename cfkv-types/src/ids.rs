//! Content-addressed identifiers.
//!
//! Every entity ID is a signed 64-bit integer derived from a truncated digest
//! of the entity's canonical bytes (see `cfkv-hash`). The newtypes keep a
//! configuration ID from being passed where a property ID is expected; the
//! array store only sees the untyped [`RecordKey`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Untyped key of one record inside an array-store field group.
pub type RecordKey = i64;

macro_rules! content_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            #[inline]
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            #[inline]
            pub const fn raw(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            #[inline]
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for i64 {
            #[inline]
            fn from(id: $name) -> i64 {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

content_id!(
    /// Identity of one atomic structure; independent of names and labels.
    ConfigurationId
);
content_id!(
    /// Identity of one property instance; derived from its field values.
    PropertyId
);
content_id!(
    /// Identity of a property-settings record (method, description, files).
    PropertySettingsId
);
content_id!(
    /// Identity of a configuration set; order-independent over its members.
    ConfigurationSetId
);
content_id!(
    /// Identity of a dataset; order-independent over sets and properties.
    DatasetId
);
