//! Error types and result definitions for cfkv.
//!
//! Every cfkv crate returns [`Result<T>`], whose error variant is the single
//! workspace-wide [`Error`] enum. Keeping one enum lets errors cross crate
//! boundaries with `?` and lets callers match on the exact failure kind.
//!
//! # Error Categories
//!
//! - **Backend errors** ([`Error::Io`], [`Error::Arrow`], [`Error::Json`]):
//!   propagated unchanged from the storage runtimes, never retried.
//! - **Concatenation refusal** ([`Error::Concatenation`]): a ragged field group
//!   cannot be stacked. Non-fatal; the group is still readable per record.
//! - **Property validation** ([`Error::Schema`], [`Error::MissingField`],
//!   [`Error::ShapeMismatch`], [`Error::UnknownUnit`]): a property was rejected
//!   and its record was not inserted.
//! - **Lookup failures** ([`Error::NotFound`]): missing documents, IDs or paths.
//! - **Internal errors** ([`Error::Internal`]): corrupted blobs or violated
//!   invariants.

pub mod error;
pub mod result;

pub use error::Error;
pub use result::Result;
