//! Types downstream clients interact with.
mod errors;

pub use errors::{ReferenceKind, RepositoryError, Result, RuntimeError};
