use std::path::{Path, PathBuf};
use std::sync::Arc;

use galley_api::{EventPublisher, HttpPublisher, OfflinePublisher};
use galley_core::{
    Catalog, CatalogLoadError, CatalogStore, HistoryLog, MatchStrategy, Resolution, ScanRecord,
    ScanStatus, SessionContext, resolve,
};
use galley_scan::{
    AnnotatedFrame, Decoder, Frame, ImageDirSource, Notice, Notifier, QrDecoder, ScanConfig,
    ScanController, annotate,
};
use tracing::{info, warn};

use crate::error::ToolError;

fn report_warnings(warnings: &[CatalogLoadError]) {
    for warning in warnings {
        warn!("{warning}");
    }
}

fn strategy_name(strategy: MatchStrategy) -> &'static str {
    match strategy {
        MatchStrategy::Exact => "exact",
        MatchStrategy::Substring => "substring",
        MatchStrategy::SuffixId => "suffix-id",
    }
}

fn describe(resolution: &Resolution) -> String {
    match resolution {
        Resolution::Found { item, strategy } => format!(
            "{} (id {}, {} match)",
            item.name,
            item.id,
            strategy_name(*strategy)
        ),
        Resolution::NotFound(payload) => format!("not in catalog: {payload}"),
    }
}

pub fn catalog(path: &Path, reload: bool) -> Result<(), ToolError> {
    let (store, warnings) = CatalogStore::open(path);
    report_warnings(&warnings);

    if reload {
        let before = store.snapshot();
        report_warnings(&store.reload()?);
        let after = store.snapshot();
        if before == after {
            println!("Reloaded {}: unchanged", path.display());
        } else {
            println!("Reloaded {}: {} -> {} entries", path.display(), before.len(), after.len());
        }
    }

    let snapshot = store.snapshot();
    for entry in snapshot.iter() {
        println!("{}\t{}\t{}", entry.id(), entry.name, entry.url);
    }
    println!("{} products", snapshot.len());
    Ok(())
}

pub fn resolve_payload(path: &Path, payload: &str) {
    let load = Catalog::load(path);
    report_warnings(&load.warnings);
    println!("{}", describe(&resolve(&load.catalog, payload)));
}

pub fn decode(
    catalog_path: &Path,
    image: &Path,
    annotate_to: Option<PathBuf>,
) -> Result<(), ToolError> {
    let load = Catalog::load(catalog_path);
    report_warnings(&load.warnings);

    let frame = Frame::open(image)?;
    let detections = QrDecoder.decode(&frame);
    if detections.is_empty() {
        println!("No codes found in {}", image.display());
    }
    for detection in &detections {
        println!(
            "{} -> {}",
            detection.payload,
            describe(&resolve(&load.catalog, &detection.payload))
        );
    }

    if let Some(out) = annotate_to {
        annotate(&frame, &detections, &load.catalog).image.save(&out)?;
        info!(path = %out.display(), "annotated frame written");
    }
    Ok(())
}

/// Prints notices for the operator as they happen.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        match notice {
            Notice::Success(msg) => println!("[ok] {msg}"),
            Notice::Warning(msg) => println!("[warn] {msg}"),
            Notice::Error(msg) => eprintln!("[error] {msg}"),
        }
    }
}

pub struct ScanArgs {
    pub catalog_path: PathBuf,
    pub frames: PathBuf,
    pub api_base: Option<String>,
    pub publish_timeout: std::time::Duration,
    pub config: ScanConfig,
    pub session: SessionContext,
    pub history: Option<PathBuf>,
    pub export: Option<PathBuf>,
    pub annotate_dir: Option<PathBuf>,
}

pub async fn scan(args: ScanArgs) -> Result<(), ToolError> {
    let (store, warnings) = CatalogStore::open(&args.catalog_path);
    report_warnings(&warnings);

    let publisher: Box<dyn EventPublisher> = match &args.api_base {
        Some(base) => Box::new(HttpPublisher::with_timeout(base.clone(), args.publish_timeout)?),
        None => {
            info!("no API base configured, scans will be recorded locally");
            Box::new(OfflinePublisher)
        }
    };

    let history = match &args.history {
        Some(path) if path.exists() => HistoryLog::load_json(path)?,
        _ => HistoryLog::new(),
    };

    let mut controller = ScanController::new(
        Arc::new(store),
        QrDecoder,
        publisher,
        args.session,
        args.config,
    )
    .with_notifier(ConsoleNotifier)
    .with_history(history);

    if let Some(dir) = &args.annotate_dir {
        std::fs::create_dir_all(dir)?;
    }
    let mut frame_no = 0usize;
    let mut save_error = None;
    let mut sink = |frame: AnnotatedFrame| {
        frame_no += 1;
        let Some(dir) = &args.annotate_dir else {
            return;
        };
        if frame.labels.is_empty() || save_error.is_some() {
            return;
        }
        let path = dir.join(format!("frame-{frame_no:04}.png"));
        if let Err(e) = frame.image.save(&path) {
            save_error = Some(e);
        }
    };

    let mut camera = ImageDirSource::new(&args.frames);
    let result = controller.run(&mut camera, &mut sink).await;

    print_history(controller.history());
    if let Some(path) = &args.history {
        controller.history().save_json(path)?;
    }
    if let Some(path) = &args.export {
        controller.history().export_to_path(path)?;
        println!("Exported {} records to {}", controller.history().len(), path.display());
    }
    if let Some(e) = save_error {
        warn!(error = %e, "could not write annotated frames");
    }

    let report = result?;
    println!(
        "Session {:?}: {} cycles, {} detections, {} published",
        report.state, report.cycles, report.detections, report.published
    );
    Ok(())
}

pub fn history(path: &Path, export: Option<PathBuf>, clear: bool) -> Result<(), ToolError> {
    let mut log = HistoryLog::load_json(path)?;
    print_history(&log);

    if let Some(out) = export {
        log.export_to_path(&out)?;
        println!("Exported {} records to {}", log.len(), out.display());
    }
    if clear {
        log.clear();
        log.save_json(path)?;
        println!("History cleared");
    }
    Ok(())
}

fn print_history(log: &HistoryLog) {
    if log.is_empty() {
        println!("No scans recorded");
        return;
    }
    for record in log.iter() {
        println!("{}", history_line(record));
    }
}

fn history_line(record: &ScanRecord) -> String {
    let status = match record.status {
        ScanStatus::Success => "ok  ",
        ScanStatus::Failure => "miss",
    };
    format!(
        "{} {} {} [{}] {}",
        record.timestamp, status, record.item_name, record.item_id, record.scanned_by
    )
}
