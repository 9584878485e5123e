#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # harvest-core
//!
//! Data model and output format shared by the bookwalker catalog harvester.
//!
//! - [`BookRecord`] and its optional [`BookDetail`] block
//! - [`SeriesGroup`], the envelope the API path groups books into
//! - [`Catalog`], the single JSON document written at the end of a run

pub mod error;
pub mod output;
pub mod result;
pub mod types;

pub use error::Error;
pub use output::{read_catalog, to_pretty_json, write_catalog};
pub use result::Result;
pub use types::{BookDetail, BookRecord, Catalog, SeriesGroup, DEFAULT_SENTINEL};
