//! Resolves decoded QR payloads to catalog entries.
//!
//! Strategies are tried in order and the first hit wins:
//! 1. exact: the trimmed payload equals an entry's URL
//! 2. substring: an entry's URL occurs inside the trimmed payload
//! 3. suffix id: an entry's URL ends with the payload's last path segment
//!
//! Ties within a strategy go to the entry that appears first in the catalog.

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::item::{last_segment, CatalogEntry, ItemId, ResolvedItem};

/// Which strategy produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    Exact,
    Substring,
    SuffixId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found {
        item: ResolvedItem,
        strategy: MatchStrategy,
    },
    NotFound(String),
}

impl Resolution {
    pub fn item(&self) -> Option<&ResolvedItem> {
        match self {
            Resolution::Found { item, .. } => Some(item),
            Resolution::NotFound(_) => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found { .. })
    }

    /// Text to show next to a detection: the product name, or the raw
    /// payload when nothing matched.
    pub fn display_name(&self) -> &str {
        match self {
            Resolution::Found { item, .. } => &item.name,
            Resolution::NotFound(payload) => payload,
        }
    }

    /// Id for display. Falls back to the payload's last segment on a miss.
    pub fn display_id(&self) -> ItemId {
        match self {
            Resolution::Found { item, .. } => item.id.clone(),
            Resolution::NotFound(payload) => last_segment(payload),
        }
    }
}

pub fn resolve(catalog: &Catalog, payload: &str) -> Resolution {
    let trimmed = payload.trim();
    if trimmed.is_empty() {
        return Resolution::NotFound(payload.to_string());
    }

    let found = |entry: &CatalogEntry, strategy| Resolution::Found {
        item: ResolvedItem::from(entry),
        strategy,
    };

    if let Some(entry) = catalog.iter().find(|e| e.url == trimmed) {
        return found(entry, MatchStrategy::Exact);
    }

    // Blank URLs would match everything below.
    let mut candidates = catalog.iter().filter(|e| !e.url.is_empty());
    if let Some(entry) = candidates.clone().find(|e| trimmed.contains(e.url.as_str())) {
        return found(entry, MatchStrategy::Substring);
    }

    let candidate_id = last_segment(trimmed);
    if !candidate_id.is_empty() {
        if let Some(entry) = candidates.find(|e| e.url.ends_with(candidate_id.as_str())) {
            return found(entry, MatchStrategy::SuffixId);
        }
    }

    Resolution::NotFound(payload.to_string())
}
