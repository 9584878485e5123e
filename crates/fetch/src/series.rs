//! Series grouping for catalog API items.
//!
//! A single pass: drop excluded titles, derive sortable titles, group by
//! series id, then settle one canonical name per group.

use std::collections::HashMap;

use harvest_core::{BookDetail, BookRecord, SeriesGroup};
use tracing::debug;

use crate::api::ApiItem;
use crate::rules::{CatalogRules, collapse_whitespace};

#[derive(Debug)]
struct PendingGroup {
    series_id: String,
    has_series: bool,
    raw_names: Vec<String>,
    books: Vec<BookRecord>,
}

impl PendingGroup {
    /// Override by id, then a locked raw name, then the first raw name, then the first title.
    fn canonical_name(&self, rules: &CatalogRules) -> String {
        if self.has_series {
            if let Some(name) = rules.series_override(&self.series_id) {
                return name.to_string();
            }
        }
        if let Some(locked) = self.raw_names.iter().find_map(|raw| rules.locked_name(raw)) {
            return locked.to_string();
        }
        if let Some(raw) = self.raw_names.first() {
            return raw.clone();
        }
        self.books
            .first()
            .map(|b| b.sortable_title.clone().unwrap_or_else(|| b.title.clone()))
            .unwrap_or_default()
    }

    fn finish(self, rules: &CatalogRules) -> SeriesGroup {
        let series_name = self.canonical_name(rules);
        SeriesGroup {
            series_id: self.series_id,
            series_name,
            books: self.books,
        }
    }
}

/// Convert one API item into a book record with its sortable title.
pub fn to_book(item: &ApiItem, rules: &CatalogRules) -> BookRecord {
    let title = collapse_whitespace(&item.product_name);
    let mut book = BookRecord::new(title.as_str(), item.product_url.clone().unwrap_or_default())
        .with_sortable_title(rules.sortable_title(&title));

    if let Some(id) = &item.product_id {
        book = book.with_product_id(id.as_str());
    }

    let detail = BookDetail {
        isbn: item.isbn.clone(),
        image: item.image.clone(),
        description: item.description.clone(),
        production_date: item.publish_date.clone(),
    };
    if detail != BookDetail::default() {
        book = book.with_detail(detail);
    }
    book
}

/// Group catalog items into series.
///
/// Items without a series id each form their own group, keyed by product id
/// or, failing that, by sortable title. Groups come out in order of first
/// appearance and books keep their input order.
pub fn group_series(items: &[ApiItem], rules: &CatalogRules) -> Vec<SeriesGroup> {
    let mut pending: Vec<PendingGroup> = Vec::new();
    let mut by_series: HashMap<String, usize> = HashMap::new();
    let mut by_single: HashMap<String, usize> = HashMap::new();

    for item in items {
        if rules.is_excluded(&item.product_name) {
            debug!(title = %item.product_name, "Excluded by title prefix");
            continue;
        }

        let book = to_book(item, rules);
        let (index, key, has_series) = match &item.series_id {
            Some(id) => (&mut by_series, id.clone(), true),
            None => {
                let key = item
                    .product_id
                    .clone()
                    .or_else(|| book.sortable_title.clone())
                    .unwrap_or_else(|| book.title.clone());
                (&mut by_single, key, false)
            }
        };

        let slot = *index.entry(key.clone()).or_insert_with(|| {
            pending.push(PendingGroup {
                series_id: key,
                has_series,
                raw_names: Vec::new(),
                books: Vec::new(),
            });
            pending.len().saturating_sub(1)
        });

        if let Some(group) = pending.get_mut(slot) {
            if let Some(raw) = item.series_name.as_deref().map(collapse_whitespace) {
                if !raw.is_empty() && !group.raw_names.contains(&raw) {
                    group.raw_names.push(raw);
                }
            }
            group.books.push(book);
        }
    }

    pending.into_iter().map(|g| g.finish(rules)).collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::indexing_slicing)]

    use super::*;

    #[test]
    fn test_short_story_excluded_and_volume_stripped() {
        let items = vec![
            ApiItem::named("[Short Story Set] Foo").in_series("1", None),
            ApiItem::named("Bar เล่ม 2").in_series("1", Some("Bar")),
        ];

        let groups = group_series(&items, &CatalogRules::default());

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].series_id, "1");
        assert_eq!(groups[0].series_name, "Bar");
        assert_eq!(groups[0].books.len(), 1);
        let sortable = groups[0].books[0].sortable_title.as_deref().unwrap_or_default();
        assert!(!sortable.contains("เล่ม"));
        assert_eq!(sortable, "Bar 2");
    }

    #[test]
    fn test_locked_name_wins_over_raw_names() {
        let rules = CatalogRules::default().with_locked_name("Shingeki", "Attack on Titan");
        let items = vec![
            ApiItem::named("Attack on Titan เล่ม 1").in_series("7", Some("Attack on Titan (Manga)")),
            ApiItem::named("Attack on Titan เล่ม 2").in_series("7", Some("Shingeki")),
        ];

        let groups = group_series(&items, &rules);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].series_name, "Attack on Titan");
        assert_eq!(groups[0].books.len(), 2);
    }

    #[test]
    fn test_series_override_by_id_wins() {
        let rules = CatalogRules::default()
            .with_locked_name("Slime", "That Time I Got Reincarnated as a Slime")
            .with_series_override("9", "Tensura");
        let items = vec![ApiItem::named("Slime 1").in_series("9", Some("Slime"))];

        let groups = group_series(&items, &rules);

        assert_eq!(groups[0].series_name, "Tensura");
    }

    #[test]
    fn test_first_raw_name_when_nothing_is_locked() {
        let items = vec![
            ApiItem::named("A 1").in_series("3", None),
            ApiItem::named("A 2").in_series("3", Some("  Series   A ")),
            ApiItem::named("A 3").in_series("3", Some("Series A (old)")),
        ];

        let groups = group_series(&items, &CatalogRules::default());

        assert_eq!(groups[0].series_name, "Series A");
    }

    #[test]
    fn test_items_without_series_stand_alone() {
        let mut with_id = ApiItem::named("Solo เล่ม 1");
        with_id.product_id = Some("p-1".into());
        let items = vec![with_id, ApiItem::named("Other"), ApiItem::named("Bar 1").in_series("1", Some("Bar"))];

        let groups = group_series(&items, &CatalogRules::default());

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].series_id, "p-1");
        assert_eq!(groups[0].series_name, "Solo 1");
        assert_eq!(groups[1].series_id, "Other");
        assert_eq!(groups[2].series_id, "1");
    }

    #[test]
    fn test_groups_keep_first_appearance_order() {
        let items = vec![
            ApiItem::named("B 1").in_series("b", Some("B")),
            ApiItem::named("A 1").in_series("a", Some("A")),
            ApiItem::named("B 2").in_series("b", Some("B")),
        ];

        let groups = group_series(&items, &CatalogRules::default());

        let ids: Vec<&str> = groups.iter().map(|g| g.series_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        let titles: Vec<&str> = groups[0].books.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["B 1", "B 2"]);
    }

    #[test]
    fn test_detail_attached_only_when_present() {
        let mut item = ApiItem::named("Bar 1");
        item.isbn = Some("978".into());
        let with_detail = to_book(&item, &CatalogRules::default());
        let without = to_book(&ApiItem::named("Bar 2"), &CatalogRules::default());

        assert_eq!(with_detail.detail.and_then(|d| d.isbn), Some("978".to_string()));
        assert!(without.detail.is_none());
    }
}
