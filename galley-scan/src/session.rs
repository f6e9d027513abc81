//! Scan session controller.
//!
//! One session is a bounded loop: read a frame, decode it, resolve each
//! detection, publish matches that pass the debouncer, record everything in
//! the history, and hand an annotated frame to the display. The loop checks
//! for a stop request and the cycle limit at the top of every iteration and
//! releases the camera on every way out.

use std::sync::Arc;
use std::time::Duration;

use galley_api::EventPublisher;
use galley_core::{
    resolve, Catalog, CatalogStore, Debouncer, HistoryLog, LocalOnlyReason, PublishOutcome,
    Resolution, ScanEvent, ScanRecord, SessionContext, StopHandle, DEFAULT_COOLDOWN,
};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::annotate::{annotate, AnnotatedFrame};
use crate::clock::{Clock, SystemClock};
use crate::decoder::{DetectedCode, Decoder};
use crate::error::{CameraError, ScanError};
use crate::frame::{CameraGuard, FrameSource};
use crate::notify::{LogNotifier, Notice, Notifier};

pub const DEFAULT_MAX_CYCLES: usize = 150;
pub const DEFAULT_FRAMES_PER_SECOND: u32 = 30;
pub const DEFAULT_FRAME_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active,
    StoppedByLimit,
    StoppedByError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Cycles before the session stops on its own.
    pub max_cycles: usize,
    /// Pause between cycles. Zero runs flat out.
    pub frame_interval: Duration,
    /// Budget for opening the camera and for each frame read.
    pub frame_timeout: Duration,
    pub cooldown: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_cycles: DEFAULT_MAX_CYCLES,
            frame_interval: Duration::from_secs(1) / DEFAULT_FRAMES_PER_SECOND,
            frame_timeout: DEFAULT_FRAME_TIMEOUT,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

impl ScanConfig {
    pub fn with_frames_per_second(mut self, fps: u32) -> Self {
        self.frame_interval = if fps == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(1) / fps
        };
        self
    }
}

/// Receives annotated frames for display.
pub trait FrameSink {
    fn show(&mut self, frame: AnnotatedFrame);
}

impl<F: FnMut(AnnotatedFrame)> FrameSink for F {
    fn show(&mut self, frame: AnnotatedFrame) {
        self(frame)
    }
}

/// Summary of one finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub state: SessionState,
    pub cycles: usize,
    pub detections: usize,
    pub published: usize,
    pub recorded: usize,
}

pub struct ScanController<D, P> {
    catalog: Arc<CatalogStore>,
    decoder: D,
    publisher: P,
    session: SessionContext,
    config: ScanConfig,
    notifier: Box<dyn Notifier>,
    clock: Arc<dyn Clock>,
    debouncer: Debouncer,
    history: HistoryLog,
    state: SessionState,
    stop: StopHandle,
}

#[derive(Default)]
struct Counters {
    cycles: usize,
    detections: usize,
    published: usize,
    recorded: usize,
}

impl<D: Decoder, P: EventPublisher> ScanController<D, P> {
    pub fn new(
        catalog: Arc<CatalogStore>,
        decoder: D,
        publisher: P,
        session: SessionContext,
        config: ScanConfig,
    ) -> Self {
        Self {
            catalog,
            decoder,
            publisher,
            session,
            debouncer: Debouncer::with_cooldown(config.cooldown),
            config,
            notifier: Box::new(LogNotifier),
            clock: Arc::new(SystemClock),
            history: HistoryLog::new(),
            state: SessionState::Idle,
            stop: StopHandle::default(),
        }
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Seeds the log, e.g. with a history loaded from disk.
    pub fn with_history(mut self, history: HistoryLog) -> Self {
        self.history = history;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn reset_debouncer(&mut self) {
        self.debouncer.reset();
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Runs one session against `source` until it is stopped, hits the
    /// cycle limit, or the camera fails.
    pub async fn run<S, K>(
        &mut self,
        source: &mut S,
        sink: &mut K,
    ) -> Result<SessionReport, ScanError>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        if self.state == SessionState::Active {
            warn!("previous session did not finish cleanly, stopping it");
            self.state = SessionState::Idle;
        }
        self.stop.reset();

        let catalog_store = Arc::clone(&self.catalog);
        if catalog_store.snapshot().is_empty() {
            self.notifier.notify(Notice::Error(
                "No products loaded; cannot start scanning".to_string(),
            ));
            self.state = SessionState::Idle;
            return Err(ScanError::CatalogNotLoaded);
        }
        // A session already scanning this catalog is stopped before this one starts.
        let lease = catalog_store.acquire_scan(self.stop.clone()).await;

        match timeout(self.config.frame_timeout, source.open()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(self.open_failed(e)),
            Err(_) => {
                source.release();
                return Err(self.open_failed(CameraError::Timeout(self.config.frame_timeout)));
            }
        }

        let mut camera = CameraGuard::new(source);
        self.state = SessionState::Active;
        info!(max_cycles = self.config.max_cycles, "scan session started");

        let mut counters = Counters::default();
        loop {
            if self.stop.is_requested() {
                self.state = SessionState::Idle;
                break;
            }
            if counters.cycles >= self.config.max_cycles {
                self.state = SessionState::StoppedByLimit;
                break;
            }

            let frame = match timeout(self.config.frame_timeout, camera.read()).await {
                Ok(Ok(frame)) => frame,
                Ok(Err(e)) => return Err(self.read_failed(e)),
                Err(_) => {
                    let error = CameraError::Timeout(self.config.frame_timeout);
                    return Err(self.read_failed(error));
                }
            };
            counters.cycles += 1;

            let detections = self.decoder.decode(&frame);
            for detection in &detections {
                self.process(lease.catalog(), detection, &mut counters).await;
            }
            counters.detections += detections.len();

            sink.show(annotate(&frame, &detections, lease.catalog()));

            if !self.config.frame_interval.is_zero() {
                tokio::time::sleep(self.config.frame_interval).await;
            }
        }

        drop(camera);
        info!(
            state = ?self.state,
            cycles = counters.cycles,
            published = counters.published,
            "scan session ended"
        );

        Ok(SessionReport {
            state: self.state,
            cycles: counters.cycles,
            detections: counters.detections,
            published: counters.published,
            recorded: counters.recorded,
        })
    }

    async fn process(
        &mut self,
        catalog: &Catalog,
        detection: &DetectedCode,
        counters: &mut Counters,
    ) {
        let payload = detection.payload.as_str();
        match resolve(catalog, payload) {
            Resolution::Found { item, strategy } => {
                if !self.debouncer.should_emit(payload, self.clock.now()) {
                    debug!(%payload, "suppressed by cooldown");
                    return;
                }
                debug!(%payload, ?strategy, item_id = %item.id, "payload matched");

                let event = ScanEvent::new(payload, &item, &self.session, self.clock.wall());
                let outcome = self
                    .publisher
                    .publish(&event, self.session.auth_token.as_deref())
                    .await;
                counters.published += 1;

                self.notifier.notify(match &outcome {
                    PublishOutcome::Sent(_) => Notice::Success(format!("Registered {}", item.name)),
                    PublishOutcome::SentWithServerError(status) => Notice::Warning(format!(
                        "Registered {} locally; server answered {status}",
                        item.name
                    )),
                    PublishOutcome::LocalOnly(reason) => Notice::Warning(format!(
                        "Registered {} locally ({})",
                        item.name,
                        local_reason_text(*reason)
                    )),
                });

                let record =
                    ScanRecord::success(payload, item, outcome, &self.session, self.clock.wall());
                self.history.append(record);
            }
            Resolution::NotFound(_) => {
                self.notifier
                    .notify(Notice::Warning(format!("Product not found: {payload}")));
                let record = ScanRecord::failure(payload, &self.session, self.clock.wall());
                self.history.append(record);
            }
        }
        counters.recorded += 1;
    }

    fn open_failed(&mut self, error: CameraError) -> ScanError {
        warn!(%error, "could not open camera");
        self.notifier
            .notify(Notice::Error(format!("Could not open camera: {error}")));
        self.state = SessionState::Idle;
        ScanError::CameraOpen(error)
    }

    fn read_failed(&mut self, error: CameraError) -> ScanError {
        warn!(%error, "camera read failed, stopping session");
        self.notifier
            .notify(Notice::Error(format!("Camera stopped responding: {error}")));
        self.state = SessionState::StoppedByError;
        ScanError::CameraRead(error)
    }
}

fn local_reason_text(reason: LocalOnlyReason) -> &'static str {
    match reason {
        LocalOnlyReason::Offline => "API unreachable",
        LocalOnlyReason::Timeout => "API timed out",
        LocalOnlyReason::Exception => "API error",
    }
}
