//! Product catalog loaded from a CSV file with `name` and `url` columns.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::error::{CatalogError, CatalogLoadError};
use crate::item::CatalogEntry;
use crate::stop::StopHandle;

const REQUIRED_COLUMNS: [&str; 2] = ["name", "url"];

/// Immutable snapshot of the catalog, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

/// Result of reading a catalog source: the rows that could be read plus
/// anything that went wrong along the way.
#[derive(Debug, Default)]
pub struct CatalogLoad {
    pub catalog: Catalog,
    pub warnings: Vec<CatalogLoadError>,
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CatalogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reads a catalog from a file. Never fails: a missing or unreadable file
    /// yields an empty catalog with the cause recorded in `warnings`.
    pub fn load(path: impl AsRef<Path>) -> CatalogLoad {
        let path = path.as_ref();
        if !path.exists() {
            return CatalogLoad {
                catalog: Catalog::default(),
                warnings: vec![CatalogLoadError::FileNotFound(path.to_path_buf())],
            };
        }

        match std::fs::File::open(path) {
            Ok(file) => Self::from_reader(file),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CatalogLoad {
                catalog: Catalog::default(),
                warnings: vec![CatalogLoadError::FileNotFound(path.to_path_buf())],
            },
            Err(e) => CatalogLoad {
                catalog: Catalog::default(),
                warnings: vec![CatalogLoadError::MalformedData(e.to_string())],
            },
        }
    }

    /// Reads a catalog from CSV text. Missing `name`/`url` columns are
    /// reported but the rows still load with those fields left empty.
    pub fn from_reader<R: Read>(reader: R) -> CatalogLoad {
        let mut csv = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = match csv.headers() {
            Ok(h) => h.clone(),
            Err(e) => {
                return CatalogLoad {
                    catalog: Catalog::default(),
                    warnings: vec![CatalogLoadError::MalformedData(e.to_string())],
                };
            }
        };

        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
        };
        let name_idx = column("name");
        let url_idx = column("url");

        let mut warnings = Vec::new();
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .zip([name_idx, url_idx])
            .filter(|(_, idx)| idx.is_none())
            .map(|(col, _)| col.to_string())
            .collect();
        if !missing.is_empty() {
            warn!(columns = ?missing, "catalog is missing required columns");
            warnings.push(CatalogLoadError::MissingRequiredColumns(missing));
        }

        let field = |record: &csv::StringRecord, idx: Option<usize>| {
            idx.and_then(|i| record.get(i)).unwrap_or_default().to_string()
        };

        let mut entries = Vec::new();
        for record in csv.records() {
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    warn!(error = %e, "failed to parse catalog row");
                    warnings.push(CatalogLoadError::MalformedData(e.to_string()));
                    return CatalogLoad {
                        catalog: Catalog::default(),
                        warnings,
                    };
                }
            };
            entries.push(CatalogEntry {
                name: field(&record, name_idx),
                url: field(&record, url_idx),
            });
        }

        debug!(entries = entries.len(), "catalog parsed");
        CatalogLoad {
            catalog: Catalog::new(entries),
            warnings,
        }
    }
}

/// Owns the live catalog and swaps it wholesale on reload, so readers see
/// either the old or the new snapshot.
#[derive(Debug)]
pub struct CatalogStore {
    path: PathBuf,
    current: RwLock<Arc<Catalog>>,
    /// Stop handle of the session holding the lease, if any.
    active: Mutex<Option<StopHandle>>,
    released: Notify,
}

impl CatalogStore {
    /// Loads the catalog at `path`, returning the store and any load warnings.
    pub fn open(path: impl Into<PathBuf>) -> (Self, Vec<CatalogLoadError>) {
        let path = path.into();
        let load = Catalog::load(&path);
        info!(path = %path.display(), entries = load.catalog.len(), "catalog loaded");
        let store = Self {
            path,
            current: RwLock::new(Arc::new(load.catalog)),
            active: Mutex::new(None),
            released: Notify::new(),
        };
        (store, load.warnings)
    }

    /// Wraps an already-built catalog. Reload re-reads `path`.
    pub fn with_catalog(path: impl Into<PathBuf>, catalog: Catalog) -> Self {
        Self {
            path: path.into(),
            current: RwLock::new(Arc::new(catalog)),
            active: Mutex::new(None),
            released: Notify::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<Catalog> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn is_scanning(&self) -> bool {
        self.active().is_some()
    }

    fn active(&self) -> MutexGuard<'_, Option<StopHandle>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Re-reads the source and replaces the catalog. Refused while a scan
    /// session holds a lease.
    pub fn reload(&self) -> Result<Vec<CatalogLoadError>, CatalogError> {
        if self.is_scanning() {
            return Err(CatalogError::Busy);
        }
        let load = Catalog::load(&self.path);
        info!(path = %self.path.display(), entries = load.catalog.len(), "catalog reloaded");
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(load.catalog);
        Ok(load.warnings)
    }

    /// Takes the lease if no session holds it.
    pub fn begin_scan(&self, stop: StopHandle) -> Result<ScanLease<'_>, CatalogError> {
        let mut active = self.active();
        if active.is_some() {
            return Err(CatalogError::Busy);
        }
        *active = Some(stop);
        Ok(self.lease())
    }

    /// Takes the lease, first stopping the session that holds it and waiting
    /// for that session to let go.
    pub async fn acquire_scan(&self, stop: StopHandle) -> ScanLease<'_> {
        loop {
            let released = self.released.notified();
            {
                let mut active = self.active();
                if active.is_none() {
                    *active = Some(stop);
                    return self.lease();
                }
                if let Some(prior) = active.as_ref() {
                    info!("stopping the running scan session");
                    prior.stop();
                }
            }
            released.await;
        }
    }

    fn lease(&self) -> ScanLease<'_> {
        ScanLease {
            store: self,
            catalog: self.snapshot(),
        }
    }
}

/// Held for the duration of a scan session; pins the catalog snapshot.
#[derive(Debug)]
pub struct ScanLease<'a> {
    store: &'a CatalogStore,
    catalog: Arc<Catalog>,
}

impl ScanLease<'_> {
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

impl Drop for ScanLease<'_> {
    fn drop(&mut self) {
        self.store.active().take();
        self.store.released.notify_waiters();
    }
}
