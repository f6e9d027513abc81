//! Camera side of galley inventory scanning: frames, QR decoding, frame
//! annotation and the scan session loop that drives the whole pipeline.

pub mod annotate;
pub mod clock;
pub mod decoder;
pub mod error;
pub mod frame;
pub mod notify;
pub mod session;

pub use annotate::{annotate, truncate_label, AnnotatedFrame, Label, LABEL_MAX_CHARS};
pub use clock::{Clock, ManualClock, SystemClock};
pub use decoder::{DetectedCode, Decoder, Point, QrDecoder};
pub use error::{CameraError, ScanError};
pub use frame::{CameraGuard, Frame, FrameSource, ImageDirSource};
pub use notify::{LogNotifier, Notice, Notifier};
pub use session::{
    FrameSink, ScanConfig, ScanController, SessionReport, SessionState,
    DEFAULT_FRAMES_PER_SECOND, DEFAULT_FRAME_TIMEOUT, DEFAULT_MAX_CYCLES,
};

pub use galley_core::StopHandle;
