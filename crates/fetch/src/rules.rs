//! Catalog rules: which titles to skip, how to normalize titles, and how to
//! correct inconsistent series names.
//!
//! Rules are data. The defaults below cover the storefront as harvested
//! today; a config file replaces any of the lists wholesale.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[expect(clippy::expect_used)]
static WHITESPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("hardcoded regex pattern is valid"));

/// Title filters, title normalization, and series-name overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogRules {
    /// Titles starting with any of these are dropped (anthologies, short-story sets).
    pub excluded_prefixes: Vec<String>,
    /// Removed wherever they occur when deriving a sortable title.
    pub strip_substrings: Vec<String>,
    /// Removed from the start of a title when deriving a sortable title.
    pub strip_prefixes: Vec<String>,
    /// Series id to the series name that must be used for it.
    pub series_overrides: BTreeMap<String, String>,
    /// Raw series name as the storefront spells it to its locked canonical name.
    pub locked_names: BTreeMap<String, String>,
}

impl Default for CatalogRules {
    fn default() -> Self {
        Self {
            excluded_prefixes: to_strings(&["[Short Story Set]", "[Short Story]", "[Anthology]"]),
            strip_substrings: to_strings(&[
                "เล่ม",
                "(Light Novel)",
                "(LN)",
                "(Manga)",
                "(นิยาย)",
                "(การ์ตูน)",
                "(จบ)",
            ]),
            strip_prefixes: to_strings(&["[Pre-Order]", "[E-Book Exclusive]"]),
            series_overrides: BTreeMap::new(),
            locked_names: BTreeMap::new(),
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

/// Trim and squeeze every whitespace run to a single space.
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE_REGEX.replace_all(s.trim(), " ").into_owned()
}

impl CatalogRules {
    /// Rules that exclude nothing and leave titles untouched.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            excluded_prefixes: Vec::new(),
            strip_substrings: Vec::new(),
            strip_prefixes: Vec::new(),
            series_overrides: BTreeMap::new(),
            locked_names: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_excluded_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.excluded_prefixes.push(prefix.into());
        self
    }

    #[must_use]
    pub fn with_strip_substring(mut self, substring: impl Into<String>) -> Self {
        self.strip_substrings.push(substring.into());
        self
    }

    #[must_use]
    pub fn with_series_override(mut self, series_id: impl Into<String>, name: impl Into<String>) -> Self {
        self.series_overrides.insert(series_id.into(), name.into());
        self
    }

    #[must_use]
    pub fn with_locked_name(mut self, raw: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.locked_names.insert(raw.into(), canonical.into());
        self
    }

    /// True when `title` begins with an excluded prefix (leading whitespace ignored).
    pub fn is_excluded(&self, title: &str) -> bool {
        let title = title.trim_start();
        self.excluded_prefixes
            .iter()
            .filter(|p| !p.is_empty())
            .any(|p| title.starts_with(p.as_str()))
    }

    /// Title with strip prefixes, locked-name prefixes and strip substrings
    /// removed and whitespace collapsed.
    ///
    /// A locked name (raw spelling or canonical) is only stripped as a whole
    /// word and never when it is the entire title. Runs to a fixed point, so
    /// removing one token never leaves another behind.
    pub fn sortable_title(&self, title: &str) -> String {
        let mut current = collapse_whitespace(title);
        loop {
            let next = self.strip_once(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn strip_once(&self, title: &str) -> String {
        let mut current = title;
        while let Some(rest) = self
            .strip_prefixes
            .iter()
            .filter(|p| !p.trim().is_empty())
            .find_map(|p| current.strip_prefix(p.as_str()))
        {
            current = rest.trim_start();
        }
        if let Some(rest) = self.strip_locked_prefix(current) {
            current = rest;
        }

        let stripped = self
            .strip_substrings
            .iter()
            .filter(|s| !s.trim().is_empty())
            .fold(current.to_string(), |acc, s| acc.replace(s.as_str(), " "));

        collapse_whitespace(&stripped)
    }

    /// Remainder of `title` after the longest locked name it starts with.
    fn strip_locked_prefix<'a>(&self, title: &'a str) -> Option<&'a str> {
        self.locked_names
            .iter()
            .flat_map(|(raw, canonical)| [raw.trim(), canonical.trim()])
            .filter(|name| !name.is_empty())
            .filter_map(|name| title.strip_prefix(name))
            .filter(|rest| rest.starts_with(|c: char| c.is_whitespace() || !c.is_alphanumeric()))
            .map(str::trim_start)
            .filter(|rest| !rest.is_empty())
            .min_by_key(|rest| rest.len())
    }

    /// Canonical name for a raw series name, if it is locked.
    pub fn locked_name(&self, raw: &str) -> Option<&str> {
        self.locked_names.get(raw.trim()).map(String::as_str)
    }

    /// Name forced for a series id, if any.
    pub fn series_override(&self, series_id: &str) -> Option<&str> {
        self.series_overrides.get(series_id).map(String::as_str)
    }
}
