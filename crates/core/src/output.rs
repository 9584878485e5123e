//! Catalog file output.
//!
//! The catalog is one UTF-8 JSON document indented with four spaces. Non-ASCII
//! text (Thai titles and descriptions) is written as-is, never `\u` escaped.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tracing::info;

use crate::error::Error;
use crate::result::Result;
use crate::types::Catalog;

const INDENT: &[u8] = b"    ";

/// Render any serializable value as four-space indented JSON.
///
/// # Errors
///
/// Returns [`Error::JsonEncodeFailed`] if the value cannot be serialized.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
    value
        .serialize(&mut serializer)
        .map_err(|e| Error::json_encode_failed(e.to_string()))?;
    String::from_utf8(buf).map_err(|e| Error::json_encode_failed(e.to_string()))
}

/// Validate and write the catalog to `path`, replacing any existing file.
///
/// # Errors
///
/// Returns an error if a record is invalid, encoding fails, or the file
/// cannot be written.
pub fn write_catalog(path: &Path, catalog: &Catalog) -> Result<()> {
    catalog.validate()?;
    let mut json = to_pretty_json(catalog)?;
    json.push('\n');

    fs::write(path, json).map_err(|e| Error::file_write_failed(path, e.to_string()))?;
    info!(
        path = %path.display(),
        books = catalog.book_count(),
        "Catalog written"
    );
    Ok(())
}

/// Read a catalog previously written by [`write_catalog`].
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a catalog document.
pub fn read_catalog(path: &Path) -> Result<Catalog> {
    let content =
        fs::read_to_string(path).map_err(|e| Error::file_read_failed(path, e.to_string()))?;
    serde_json::from_str(&content).map_err(|e| Error::json_parse_failed(e.to_string()))
}
