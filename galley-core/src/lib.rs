//! Galley Core - product catalog, payload matching, debouncing and scan
//! history for galley inventory scanning.

pub mod catalog;
pub mod debounce;
pub mod error;
pub mod event;
pub mod history;
pub mod item;
pub mod matcher;
pub mod stop;

pub use catalog::{Catalog, CatalogLoad, CatalogStore, ScanLease};
pub use debounce::{Debouncer, DEFAULT_COOLDOWN};
pub use error::{CatalogError, CatalogLoadError, HistoryError};
pub use event::{
    LocalOnlyReason, PublishOutcome, ScanAction, ScanEvent, ScanRecord, ScanResult, ScanStatus,
    SessionContext,
};
pub use history::HistoryLog;
pub use item::{last_segment, CatalogEntry, ItemId, ResolvedItem};
pub use matcher::{resolve, MatchStrategy, Resolution};
pub use stop::StopHandle;
