//! Icon lookup with a three-rung degradation ladder.
//!
//! Icon queries produced by the content variants resolve against, in order:
//!
//! 1. an injected similarity index ([`IconIndex`], typically an embedding
//!    store) — the optional capability;
//! 2. a deterministic substring match over a static [`IconCatalog`];
//! 3. [`FALLBACK_ICONS`], a fixed built-in set of generic identifiers.
//!
//! Each rung degrades to the next on absence or error, so [`find_icons`]
//! itself never fails. Catalog identifiers follow the `<name>-bold`
//! convention of the bundled icon set; search results are returned with the
//! suffix stripped.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// A similarity-search capability over icon identifiers.
///
/// Results are `(identifier, score)` pairs, best first. Identifiers may carry
/// a `||tags` suffix, which callers strip.
pub trait IconIndex: Send + Sync {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<(String, f32)>, IconIndexError>;
}

/// An icon index search failed.
#[derive(Debug, Clone, Error)]
#[error("icon index search failed: {0}")]
pub struct IconIndexError(pub String);

/// One catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IconEntry {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// The static icon catalog, loaded from JSON (`{"icons": [{name, tags}]}`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IconCatalog {
    pub icons: Vec<IconEntry>,
}

impl IconCatalog {
    /// Parse a catalog from its JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load a catalog file from disk.
    pub fn load(path: &Path) -> Result<Self, crate::error::OutlineError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            crate::error::OutlineError::InvalidConfig(format!(
                "cannot read icon catalog '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_json_str(&text).map_err(|e| {
            crate::error::OutlineError::InvalidConfig(format!(
                "cannot parse icon catalog '{}': {e}",
                path.display()
            ))
        })
    }

    /// Deterministic substring search over names and tags.
    ///
    /// Only `-bold` entries participate (the renderable subset of the
    /// bundled icon set); matches are returned with the suffix stripped, in
    /// catalog order.
    pub fn substring_search(&self, query: &str, limit: usize) -> Vec<String> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        self.icons
            .iter()
            .filter(|icon| icon.name.ends_with("-bold"))
            .filter(|icon| {
                let name = icon.name.trim_end_matches("-bold").to_lowercase();
                name.contains(&query)
                    || icon.tags.iter().any(|tag| tag.to_lowercase().contains(&query))
            })
            .map(|icon| icon.name.trim_end_matches("-bold").to_string())
            .take(limit)
            .collect()
    }
}

/// Generic icon identifiers used when neither index nor catalog can answer.
pub const FALLBACK_ICONS: &[&str] = &[
    "1",
    "2",
    "3",
    "4",
    "5",
    "star",
    "heart",
    "circle",
    "square",
    "triangle",
    "arrow-right",
    "checkmark",
    "home",
    "user",
    "settings",
    "mail",
];

/// Identifier returned when even the fallback set cannot satisfy a lookup.
pub const PLACEHOLDER_ICON: &str = "placeholder";

/// Find up to `limit` icon identifiers for a query.
///
/// Never fails: index errors and catalog misses fall through to the built-in
/// set.
pub fn find_icons(
    index: Option<&dyn IconIndex>,
    catalog: Option<&IconCatalog>,
    query: &str,
    limit: usize,
) -> Vec<String> {
    if limit == 0 {
        return Vec::new();
    }

    if let Some(index) = index {
        match index.search(query, limit) {
            Ok(results) if !results.is_empty() => {
                return results
                    .into_iter()
                    .filter_map(|(id, _score)| {
                        id.split("||").next().map(|name| name.to_string())
                    })
                    .take(limit)
                    .collect();
            }
            Ok(_) => {}
            Err(e) => warn!("icon index failed for '{query}': {e}; using catalog fallback"),
        }
    }

    if let Some(catalog) = catalog {
        let matches = catalog.substring_search(query, limit);
        if !matches.is_empty() {
            return matches;
        }
    }

    FALLBACK_ICONS
        .iter()
        .take(limit)
        .map(|s| s.to_string())
        .collect()
}

/// Resolve a single icon query to one identifier.
pub fn resolve_icon(
    index: Option<&dyn IconIndex>,
    catalog: Option<&IconCatalog>,
    query: &str,
) -> String {
    find_icons(index, catalog, query, 1)
        .into_iter()
        .next()
        .unwrap_or_else(|| PLACEHOLDER_ICON.to_string())
}

/// Resolve the per-item icon queries of a transformed slide, one identifier
/// per item.
///
/// Items without an icon query resolve to [`PLACEHOLDER_ICON`], keeping the
/// result aligned with the item list.
pub fn resolve_item_icons(
    index: Option<&dyn IconIndex>,
    catalog: Option<&IconCatalog>,
    items: &[crate::variants::ReadyItem],
) -> Vec<String> {
    items
        .iter()
        .map(|item| match item {
            crate::variants::ReadyItem::WithIconQuery { icon_query, .. } => {
                resolve_icon(index, catalog, icon_query)
            }
            _ => PLACEHOLDER_ICON.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingIndex;
    impl IconIndex for FailingIndex {
        fn search(&self, _query: &str, _limit: usize) -> Result<Vec<(String, f32)>, IconIndexError> {
            Err(IconIndexError("store offline".into()))
        }
    }

    struct FixedIndex;
    impl IconIndex for FixedIndex {
        fn search(&self, _query: &str, limit: usize) -> Result<Vec<(String, f32)>, IconIndexError> {
            Ok(vec![("rocket||launch,space".into(), 0.93)]
                .into_iter()
                .take(limit)
                .collect())
        }
    }

    fn catalog() -> IconCatalog {
        IconCatalog::from_json_str(
            r#"{"icons": [
                {"name": "rocket-bold", "tags": ["launch", "space"]},
                {"name": "rocket-thin", "tags": ["launch"]},
                {"name": "globe-bold", "tags": ["world", "international"]}
            ]}"#,
        )
        .expect("valid catalog json")
    }

    #[test]
    fn index_hit_wins_and_strips_tag_suffix() {
        let found = find_icons(Some(&FixedIndex), Some(&catalog()), "launch", 3);
        assert_eq!(found, vec!["rocket"]);
    }

    #[test]
    fn index_error_degrades_to_catalog() {
        let found = find_icons(Some(&FailingIndex), Some(&catalog()), "world", 3);
        assert_eq!(found, vec!["globe"]);
    }

    #[test]
    fn catalog_only_matches_bold_entries() {
        let found = catalog().substring_search("rocket", 10);
        assert_eq!(found, vec!["rocket"]);
    }

    #[test]
    fn no_capability_yields_builtin_set() {
        let found = find_icons(None, None, "anything", 4);
        assert_eq!(found, vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn catalog_miss_yields_builtin_set() {
        let found = find_icons(None, Some(&catalog()), "zebra", 2);
        assert_eq!(found, vec!["1", "2"]);
    }

    #[test]
    fn resolve_icon_single_hit() {
        assert_eq!(resolve_icon(None, Some(&catalog()), "space"), "rocket");
        assert_eq!(resolve_icon(None, None, "anything"), "1");
    }

    #[test]
    fn item_icons_stay_aligned_with_the_item_list() {
        use crate::variants::{HeadingItem, SlideContent};

        let content = SlideContent::HeadingsWithIcons {
            title: "t".into(),
            items: vec![
                HeadingItem {
                    heading: "Launch".into(),
                    description: "d".into(),
                },
                HeadingItem {
                    heading: "World".into(),
                    description: "d".into(),
                },
            ],
            icon_queries: vec!["space".into(), "world".into()],
        };
        let ready = content.to_generation_ready();
        let items = match &ready {
            crate::variants::ReadySlideContent::HeadingsWithIcons { items, .. } => items,
            other => panic!("unexpected variant: {other:?}"),
        };
        let icons = resolve_item_icons(None, Some(&catalog()), items);
        assert_eq!(icons, vec!["rocket", "globe"]);
    }
}
