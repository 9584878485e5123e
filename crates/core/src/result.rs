//! Result type definition for harvest-core operations.

use crate::error::Error;

/// The standard Result type for harvest-core operations.
///
/// Use the `?` operator or combinators; nothing in this crate unwraps.
pub type Result<T> = std::result::Result<T, Error>;
