use crate::error::Error;

/// Result type alias used throughout cfkv.
pub type Result<T> = std::result::Result<T, Error>;
