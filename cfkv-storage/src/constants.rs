use crate::types::PhysicalKey;

/// Well-known key holding the array store's field-group catalog.
pub const CATALOG_ROOT_PKEY: PhysicalKey = 0;

/// First key a pager may hand out for data blobs.
pub const FIRST_DATA_PKEY: PhysicalKey = CATALOG_ROOT_PKEY + 1;
