//! Catalog data model.
//!
//! Field names serialize in camelCase to match the storefront payloads
//! (`seriesId`, `productionDate`, ...). Optional fields are omitted when absent.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::result::Result;

/// Placeholder written into detail fields the storefront did not supply.
pub const DEFAULT_SENTINEL: &str = "N/A";

/// Structured detail for a single book, taken from its product page or the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production_date: Option<String>,
}

impl BookDetail {
    /// Names of the required fields (isbn, image, description) that are absent or blank.
    pub fn missing_required(&self) -> Vec<&'static str> {
        [
            ("isbn", &self.isbn),
            ("image", &self.image),
            ("description", &self.description),
        ]
        .into_iter()
        .filter(|(_, value)| is_blank(value.as_deref()))
        .map(|(name, _)| name)
        .collect()
    }

    /// True when isbn, image and description are all present and non-blank.
    pub fn is_complete(&self) -> bool {
        self.missing_required().is_empty()
    }

    /// Fill every absent or blank field, production date included, with `sentinel`.
    #[must_use]
    pub fn with_sentinel(self, sentinel: &str) -> Self {
        let fill = |value: Option<String>| match value {
            Some(v) if !v.trim().is_empty() => Some(v),
            _ => Some(sentinel.to_string()),
        };
        Self {
            isbn: fill(self.isbn),
            image: fill(self.image),
            description: fill(self.description),
            production_date: fill(self.production_date),
        }
    }

    /// A detail block with every field set to `sentinel`.
    pub fn unavailable(sentinel: &str) -> Self {
        Self::default().with_sentinel(sentinel)
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

/// A single book as discovered in the listing or the catalog API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRecord {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sortable_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<BookDetail>,
}

impl BookRecord {
    /// Create a record with only a title and a URL.
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            product_id: None,
            sortable_title: None,
            detail: None,
        }
    }

    /// Attach a product identifier.
    #[must_use]
    pub fn with_product_id(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = Some(product_id.into());
        self
    }

    /// Attach a normalized sortable title.
    #[must_use]
    pub fn with_sortable_title(mut self, sortable_title: impl Into<String>) -> Self {
        self.sortable_title = Some(sortable_title.into());
        self
    }

    /// Attach a detail block.
    #[must_use]
    pub fn with_detail(mut self, detail: BookDetail) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// Books sharing a publisher-assigned series identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesGroup {
    pub series_id: String,
    pub series_name: String,
    pub books: Vec<BookRecord>,
}

impl SeriesGroup {
    /// Create an empty group.
    pub fn new(series_id: impl Into<String>, series_name: impl Into<String>) -> Self {
        Self {
            series_id: series_id.into(),
            series_name: series_name.into(),
            books: Vec::new(),
        }
    }
}

/// The document written once at the end of a run.
///
/// Serialized untagged: both shapes are a bare JSON array on disk. An empty
/// catalog is `[]` either way and reads back as `Books`, so two empty
/// catalogs compare equal whatever their variant.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Catalog {
    /// Flat list produced by the HTML scraping path.
    Books(Vec<BookRecord>),
    /// Series envelopes produced by the API path.
    Series(Vec<SeriesGroup>),
}

impl PartialEq for Catalog {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Books(a), Self::Books(b)) => a == b,
            (Self::Series(a), Self::Series(b)) => a == b,
            _ => self.is_empty() && other.is_empty(),
        }
    }
}

impl Catalog {
    /// True when there is nothing to write: no books and no groups.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Books(books) => books.is_empty(),
            Self::Series(groups) => groups.is_empty(),
        }
    }

    /// Total number of book records, across groups when grouped.
    pub fn book_count(&self) -> usize {
        match self {
            Self::Books(books) => books.len(),
            Self::Series(groups) => groups.iter().map(|g| g.books.len()).sum(),
        }
    }

    /// Reject records that would be meaningless on disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRecord`] for a blank book title or a blank series id.
    pub fn validate(&self) -> Result<()> {
        let books: Box<dyn Iterator<Item = &BookRecord>> = match self {
            Self::Books(books) => Box::new(books.iter()),
            Self::Series(groups) => {
                if let Some(group) = groups.iter().find(|g| g.series_id.trim().is_empty()) {
                    return Err(Error::invalid_record(format!(
                        "series '{}' has an empty series id",
                        group.series_name
                    )));
                }
                Box::new(groups.iter().flat_map(|g| g.books.iter()))
            }
        };

        books
            .into_iter()
            .find(|b| b.title.trim().is_empty())
            .map_or(Ok(()), |b| {
                Err(Error::invalid_record(format!(
                    "book at '{}' has an empty title",
                    b.url
                )))
            })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::indexing_slicing)]

    use super::*;

    #[test]
    fn test_missing_required_lists_blank_fields() {
        let detail = BookDetail {
            isbn: Some("9786161234567".into()),
            image: Some("   ".into()),
            description: None,
            production_date: None,
        };
        assert_eq!(detail.missing_required(), vec!["image", "description"]);
        assert!(!detail.is_complete());
    }

    #[test]
    fn test_production_date_is_not_required() {
        let detail = BookDetail {
            isbn: Some("1".into()),
            image: Some("cover.jpg".into()),
            description: Some("desc".into()),
            production_date: None,
        };
        assert!(detail.is_complete());
    }

    #[test]
    fn test_with_sentinel_keeps_present_values() {
        let detail = BookDetail {
            isbn: Some("978".into()),
            ..BookDetail::default()
        }
        .with_sentinel(DEFAULT_SENTINEL);

        assert_eq!(detail.isbn.as_deref(), Some("978"));
        assert_eq!(detail.image.as_deref(), Some("N/A"));
        assert_eq!(detail.description.as_deref(), Some("N/A"));
        assert_eq!(detail.production_date.as_deref(), Some("N/A"));
    }

    #[test]
    fn test_record_serializes_camel_case_and_skips_absent() {
        let record = BookRecord::new("Bar", "https://example.com/de/1").with_sortable_title("Bar 2");
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["sortableTitle"], "Bar 2");
        assert!(json.get("detail").is_none());
        assert!(json.get("productId").is_none());
    }

    #[test]
    fn test_catalog_untagged_reads_series_shape() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let raw = r#"[{"seriesId":"1","seriesName":"Bar","books":[{"title":"Bar เล่ม 2","url":""}]}]"#;
        let catalog: Catalog = serde_json::from_str(raw)?;

        let Catalog::Series(groups) = catalog else {
            return Err("series document parsed as books".into());
        };
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].series_name, "Bar");
        Ok(())
    }

    #[test]
    fn test_book_count_spans_groups() {
        let mut first = SeriesGroup::new("1", "A");
        first.books.push(BookRecord::new("A 1", "u1"));
        first.books.push(BookRecord::new("A 2", "u2"));
        let mut second = SeriesGroup::new("2", "B");
        second.books.push(BookRecord::new("B 1", "u3"));

        assert_eq!(Catalog::Series(vec![first, second]).book_count(), 3);
    }

    #[test]
    fn test_empty_catalogs_are_equal_across_variants() {
        assert_eq!(Catalog::Books(Vec::new()), Catalog::Series(Vec::new()));
        let with_empty_group = Catalog::Series(vec![SeriesGroup::new("1", "Bar")]);
        assert_ne!(Catalog::Books(Vec::new()), with_empty_group);
    }

    #[test]
    fn test_validate_rejects_blank_title() {
        let catalog = Catalog::Books(vec![BookRecord::new(" ", "https://example.com/x")]);
        let err = catalog.validate().unwrap_err();
        assert!(err.to_string().contains("https://example.com/x"));
    }

    #[test]
    fn test_validate_rejects_blank_series_id() {
        let catalog = Catalog::Series(vec![SeriesGroup::new("", "Orphans")]);
        assert!(catalog.validate().is_err());
    }
}
