//! Scan session scenarios driven by a fake camera, decoder and publisher.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use galley_api::EventPublisher;
use galley_core::{
    Catalog, CatalogEntry, CatalogError, CatalogStore, LocalOnlyReason, PublishOutcome, ScanEvent,
    ScanStatus, SessionContext,
};
use galley_scan::{
    AnnotatedFrame, CameraError, DetectedCode, Decoder, Frame, FrameSource, ManualClock, Notice,
    Notifier, Point, ScanConfig, ScanController, ScanError, SessionState,
};

const WATER: &str = "https://x/posts/1";

struct FakeCamera {
    clock: Arc<ManualClock>,
    step: Duration,
    reads: usize,
    fail_open: bool,
    fail_after: Option<usize>,
    opens: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
}

impl FakeCamera {
    fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            step: Duration::from_secs(1),
            reads: 0,
            fail_open: false,
            fail_after: None,
            opens: Arc::new(AtomicUsize::new(0)),
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl FrameSource for FakeCamera {
    async fn open(&mut self) -> Result<(), CameraError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if self.fail_open {
            return Err(CameraError::Open("no device".to_string()));
        }
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Frame, CameraError> {
        if self.fail_after.is_some_and(|n| self.reads >= n) {
            return Err(CameraError::Read("device unplugged".to_string()));
        }
        if self.reads > 0 {
            self.clock.advance(self.step);
        }
        self.reads += 1;
        Ok(Frame::blank(4, 4))
    }

    fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Returns one scripted batch of payloads per frame, then nothing.
struct ScriptedDecoder {
    frames: Mutex<VecDeque<Vec<&'static str>>>,
}

impl ScriptedDecoder {
    fn new(frames: Vec<Vec<&'static str>>) -> Self {
        Self {
            frames: Mutex::new(frames.into()),
        }
    }
}

impl Decoder for ScriptedDecoder {
    fn decode(&self, _frame: &Frame) -> Vec<DetectedCode> {
        let square = vec![
            Point { x: 0, y: 0 },
            Point { x: 3, y: 0 },
            Point { x: 3, y: 3 },
            Point { x: 0, y: 3 },
        ];
        self.frames
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default()
            .into_iter()
            .map(|p| DetectedCode::new(p, square.clone()))
            .collect()
    }
}

#[derive(Clone)]
struct CountingPublisher {
    outcome: PublishOutcome,
    events: Arc<Mutex<Vec<ScanEvent>>>,
    tokens: Arc<Mutex<Vec<Option<String>>>>,
}

impl CountingPublisher {
    fn new(outcome: PublishOutcome) -> Self {
        Self {
            outcome,
            events: Arc::new(Mutex::new(Vec::new())),
            tokens: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn calls(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

#[async_trait]
impl EventPublisher for CountingPublisher {
    async fn publish(&self, event: &ScanEvent, auth_token: Option<&str>) -> PublishOutcome {
        self.events.lock().unwrap().push(event.clone());
        self.tokens.lock().unwrap().push(auth_token.map(str::to_string));
        self.outcome.clone()
    }
}

#[derive(Clone, Default)]
struct RecordingNotifier(Arc<Mutex<Vec<Notice>>>);

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.0.lock().unwrap().push(notice);
    }
}

fn crew() -> SessionContext {
    SessionContext {
        username: "marta".to_string(),
        user_id: "42".to_string(),
        role: "groundcrew".to_string(),
        auth_token: Some("tok".to_string()),
    }
}

fn catalog_store() -> Arc<CatalogStore> {
    Arc::new(CatalogStore::with_catalog(
        "products.csv",
        Catalog::new(vec![
            CatalogEntry::new("Still Water", WATER),
            CatalogEntry::new("Red Wine", "https://x/posts/2"),
        ]),
    ))
}

fn config(max_cycles: usize) -> ScanConfig {
    ScanConfig {
        max_cycles,
        frame_interval: Duration::ZERO,
        ..ScanConfig::default()
    }
}

fn controller(
    decoder: ScriptedDecoder,
    publisher: CountingPublisher,
    clock: Arc<ManualClock>,
    max_cycles: usize,
) -> ScanController<ScriptedDecoder, CountingPublisher> {
    ScanController::new(catalog_store(), decoder, publisher, crew(), config(max_cycles))
        .with_clock(clock)
}

fn discard() -> impl FnMut(AnnotatedFrame) {
    |_| {}
}

#[tokio::test]
async fn cycle_limit_stops_and_releases_camera_once() {
    let clock = Arc::new(ManualClock::new());
    let publisher = CountingPublisher::new(PublishOutcome::Sent("ok".to_string()));
    let mut ctl = controller(ScriptedDecoder::new(vec![]), publisher, Arc::clone(&clock), 150);
    let mut camera = FakeCamera::new(clock);
    let releases = Arc::clone(&camera.releases);

    let report = ctl.run(&mut camera, &mut discard()).await.unwrap();

    assert_eq!(report.state, SessionState::StoppedByLimit);
    assert_eq!(report.cycles, 150);
    assert_eq!(ctl.state(), SessionState::StoppedByLimit);
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn repeated_payload_is_debounced() {
    let clock = Arc::new(ManualClock::new());
    let publisher = CountingPublisher::new(PublishOutcome::Sent("ok".to_string()));
    // Frames arrive at t = 0s, 1s, 2s, 3s.
    let decoder = ScriptedDecoder::new(vec![vec![WATER], vec![WATER], vec![], vec![WATER]]);
    let mut ctl = controller(decoder, publisher.clone(), Arc::clone(&clock), 4);
    let mut camera = FakeCamera::new(clock);

    let report = ctl.run(&mut camera, &mut discard()).await.unwrap();

    assert_eq!(report.detections, 3);
    assert_eq!(report.published, 2);
    assert_eq!(publisher.calls(), 2);
    assert_eq!(ctl.history().len(), 2);

    let events = publisher.events.lock().unwrap();
    assert_eq!(events[0].item_name, "Still Water");
    assert_eq!(events[0].scanned_by, "marta");
    assert_eq!(events[1].item_id, "1");
}

#[tokio::test]
async fn session_token_reaches_the_publisher() {
    let clock = Arc::new(ManualClock::new());
    let publisher = CountingPublisher::new(PublishOutcome::Sent("ok".to_string()));
    let decoder = ScriptedDecoder::new(vec![vec![WATER]]);
    let mut ctl = controller(decoder, publisher.clone(), Arc::clone(&clock), 1);
    let mut camera = FakeCamera::new(clock);

    ctl.run(&mut camera, &mut discard()).await.unwrap();

    assert_eq!(
        publisher.tokens.lock().unwrap().as_slice(),
        [Some("tok".to_string())]
    );
}

#[tokio::test]
async fn unmatched_payloads_are_recorded_every_time() {
    let clock = Arc::new(ManualClock::new());
    let publisher = CountingPublisher::new(PublishOutcome::Sent("ok".to_string()));
    let decoder = ScriptedDecoder::new(vec![vec!["unknown/99"], vec!["unknown/99"]]);
    let notifier = RecordingNotifier::default();
    let mut ctl = controller(decoder, publisher.clone(), Arc::clone(&clock), 2)
        .with_notifier(notifier.clone());
    let mut camera = FakeCamera::new(clock);
    camera.step = Duration::from_millis(100);

    ctl.run(&mut camera, &mut discard()).await.unwrap();

    assert_eq!(publisher.calls(), 0);
    assert_eq!(ctl.history().len(), 2);
    assert!(ctl.history().iter().all(|r| r.status == ScanStatus::Failure));
    assert_eq!(
        notifier.0.lock().unwrap().as_slice(),
        [
            Notice::Warning("Product not found: unknown/99".to_string()),
            Notice::Warning("Product not found: unknown/99".to_string()),
        ]
    );
}

#[tokio::test]
async fn detections_in_a_frame_are_processed_in_order() {
    let clock = Arc::new(ManualClock::new());
    let publisher = CountingPublisher::new(PublishOutcome::Sent("ok".to_string()));
    let decoder = ScriptedDecoder::new(vec![vec![WATER, "https://x/posts/2"]]);
    let mut ctl = controller(decoder, publisher, Arc::clone(&clock), 1);
    let mut camera = FakeCamera::new(clock);

    ctl.run(&mut camera, &mut discard()).await.unwrap();

    let names: Vec<&str> = ctl.history().iter().map(|r| r.item_name.as_str()).collect();
    assert_eq!(names, ["Red Wine", "Still Water"]);
}

#[tokio::test]
async fn offline_publish_still_counts_as_a_successful_scan() {
    let clock = Arc::new(ManualClock::new());
    let publisher = CountingPublisher::new(PublishOutcome::LocalOnly(LocalOnlyReason::Offline));
    let notifier = RecordingNotifier::default();
    let decoder = ScriptedDecoder::new(vec![vec![WATER]]);
    let mut ctl = controller(decoder, publisher, Arc::clone(&clock), 3)
        .with_notifier(notifier.clone());
    let mut camera = FakeCamera::new(clock);

    let report = ctl.run(&mut camera, &mut discard()).await.unwrap();

    assert_eq!(report.state, SessionState::StoppedByLimit);
    let record = ctl.history().latest().unwrap();
    assert_eq!(record.status, ScanStatus::Success);
    assert_eq!(
        record.result.as_ref().unwrap().publish,
        PublishOutcome::LocalOnly(LocalOnlyReason::Offline)
    );
    assert!(matches!(
        notifier.0.lock().unwrap().first(),
        Some(Notice::Warning(msg)) if msg.contains("locally")
    ));
}

#[tokio::test]
async fn empty_catalog_never_opens_the_camera() {
    let clock = Arc::new(ManualClock::new());
    let publisher = CountingPublisher::new(PublishOutcome::Sent("ok".to_string()));
    let empty = Arc::new(CatalogStore::with_catalog("products.csv", Catalog::default()));
    let mut ctl = ScanController::new(
        empty,
        ScriptedDecoder::new(vec![]),
        publisher,
        crew(),
        config(10),
    );
    let mut camera = FakeCamera::new(clock);
    let opens = Arc::clone(&camera.opens);

    let result = ctl.run(&mut camera, &mut discard()).await;

    assert!(matches!(result, Err(ScanError::CatalogNotLoaded)));
    assert_eq!(ctl.state(), SessionState::Idle);
    assert_eq!(opens.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn camera_open_failure_returns_to_idle() {
    let clock = Arc::new(ManualClock::new());
    let publisher = CountingPublisher::new(PublishOutcome::Sent("ok".to_string()));
    let notifier = RecordingNotifier::default();
    let mut ctl = controller(ScriptedDecoder::new(vec![]), publisher, Arc::clone(&clock), 10)
        .with_notifier(notifier.clone());
    let mut camera = FakeCamera::new(clock);
    camera.fail_open = true;

    let result = ctl.run(&mut camera, &mut discard()).await;

    assert!(matches!(result, Err(ScanError::CameraOpen(_))));
    assert_eq!(ctl.state(), SessionState::Idle);
    assert!(matches!(
        notifier.0.lock().unwrap().last(),
        Some(Notice::Error(_))
    ));
}

#[tokio::test]
async fn read_failure_halts_and_releases() {
    let clock = Arc::new(ManualClock::new());
    let publisher = CountingPublisher::new(PublishOutcome::Sent("ok".to_string()));
    let decoder =
        ScriptedDecoder::new(vec![vec!["unknown/1"], vec!["unknown/2"], vec!["unknown/3"]]);
    let mut ctl = controller(decoder, publisher, Arc::clone(&clock), 150);
    let mut camera = FakeCamera::new(clock);
    camera.fail_after = Some(2);
    let releases = Arc::clone(&camera.releases);

    let result = ctl.run(&mut camera, &mut discard()).await;

    assert!(matches!(result, Err(ScanError::CameraRead(_))));
    assert_eq!(ctl.state(), SessionState::StoppedByError);
    assert_eq!(releases.load(Ordering::SeqCst), 1);
    assert_eq!(ctl.history().len(), 2);
}

#[tokio::test]
async fn stop_request_ends_session_at_next_cycle() {
    let clock = Arc::new(ManualClock::new());
    let publisher = CountingPublisher::new(PublishOutcome::Sent("ok".to_string()));
    let mut ctl = controller(ScriptedDecoder::new(vec![]), publisher, Arc::clone(&clock), 150);
    let mut camera = FakeCamera::new(clock);
    let releases = Arc::clone(&camera.releases);

    let stop = ctl.stop_handle();
    let mut shown = 0;
    let mut sink = |_frame: AnnotatedFrame| {
        shown += 1;
        if shown == 5 {
            stop.stop();
        }
    };

    let report = ctl.run(&mut camera, &mut sink).await.unwrap();

    assert_eq!(report.state, SessionState::Idle);
    assert_eq!(report.cycles, 5);
    assert_eq!(releases.load(Ordering::SeqCst), 1);

    // A fresh run is not affected by the earlier stop request.
    let report = ctl.run(&mut camera, &mut discard()).await.unwrap();
    assert_eq!(report.state, SessionState::StoppedByLimit);
}

#[tokio::test]
async fn catalog_reload_is_refused_during_a_session() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("products.csv");
    std::fs::File::create(&path)
        .unwrap()
        .write_all(format!("name,url\nStill Water,{WATER}\n").as_bytes())
        .unwrap();
    let (store, _) = CatalogStore::open(&path);
    let store = Arc::new(store);

    let clock = Arc::new(ManualClock::new());
    let publisher = CountingPublisher::new(PublishOutcome::Sent("ok".to_string()));
    let mut ctl = ScanController::new(
        Arc::clone(&store),
        ScriptedDecoder::new(vec![]),
        publisher,
        crew(),
        config(2),
    )
    .with_clock(clock.clone());
    let mut camera = FakeCamera::new(clock);

    let mut reloads = Vec::new();
    let reloading = Arc::clone(&store);
    let mut sink = |_frame: AnnotatedFrame| reloads.push(reloading.reload());
    ctl.run(&mut camera, &mut sink).await.unwrap();

    assert_eq!(reloads.len(), 2);
    assert!(reloads.iter().all(|r| matches!(r, Err(CatalogError::Busy))));
    assert!(store.reload().is_ok());
}

#[tokio::test]
async fn starting_a_second_session_stops_the_first() {
    let store = catalog_store();
    let clock = Arc::new(ManualClock::new());
    let publisher = CountingPublisher::new(PublishOutcome::Sent("ok".to_string()));

    let first_config = ScanConfig {
        frame_interval: Duration::from_millis(5),
        ..config(200)
    };
    let mut first = ScanController::new(
        Arc::clone(&store),
        ScriptedDecoder::new(vec![]),
        publisher.clone(),
        crew(),
        first_config,
    )
    .with_clock(clock.clone());
    let mut second = ScanController::new(
        Arc::clone(&store),
        ScriptedDecoder::new(vec![]),
        publisher,
        crew(),
        config(3),
    )
    .with_clock(clock.clone());

    let mut first_camera = FakeCamera::new(clock.clone());
    let mut second_camera = FakeCamera::new(clock);
    let first_releases = Arc::clone(&first_camera.releases);

    let shown = Arc::new(Mutex::new(Vec::new()));
    let first_shown = Arc::clone(&shown);
    let mut first_sink = move |_frame: AnnotatedFrame| {
        first_shown.lock().unwrap().push("first");
    };
    let second_shown = Arc::clone(&shown);
    let mut second_sink = move |_frame: AnnotatedFrame| {
        second_shown.lock().unwrap().push("second");
    };

    let (first_report, second_report) = tokio::join!(
        first.run(&mut first_camera, &mut first_sink),
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            second.run(&mut second_camera, &mut second_sink).await
        }
    );

    let first_report = first_report.unwrap();
    assert_eq!(first_report.state, SessionState::Idle);
    assert!(first_report.cycles < 200);
    assert_eq!(first_releases.load(Ordering::SeqCst), 1);

    let second_report = second_report.unwrap();
    assert_eq!(second_report.state, SessionState::StoppedByLimit);
    assert_eq!(second_report.cycles, 3);

    // Every frame of the first session was shown before the second began.
    let shown = shown.lock().unwrap();
    let handover = shown.iter().position(|s| *s == "second").unwrap();
    assert!(handover > 0);
    assert!(shown[handover..].iter().all(|s| *s == "second"));
    assert!(!store.is_scanning());
}
