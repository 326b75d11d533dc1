mod catalog;
mod config;
mod core;
mod read;

pub use self::config::ArrayStoreConfig;
pub use self::core::{ArrayStore, GroupState};
pub use self::read::{FieldData, LazyRecordIter, LazyRecords};
