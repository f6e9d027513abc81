use serde::{Deserialize, Serialize};

/// Identifier derived from the last path segment of a product URL
pub type ItemId = String;

/// A product row from the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub url: String,
}

impl CatalogEntry {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    pub fn id(&self) -> ItemId {
        last_segment(&self.url)
    }
}

/// A payload successfully resolved against the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedItem {
    pub name: String,
    pub url: String,
    pub id: ItemId,
}

impl From<&CatalogEntry> for ResolvedItem {
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            name: entry.name.clone(),
            url: entry.url.clone(),
            id: entry.id(),
        }
    }
}

/// Returns the final `/`-delimited segment, ignoring a trailing slash.
pub fn last_segment(value: &str) -> ItemId {
    value
        .trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}
