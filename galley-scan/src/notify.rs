use tracing::{error, info, warn};

/// A user-facing status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Warning(String),
    Error(String),
}

/// Fire-and-forget channel to the user interface.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice {
            Notice::Success(msg) => info!("{msg}"),
            Notice::Warning(msg) => warn!("{msg}"),
            Notice::Error(msg) => error!("{msg}"),
        }
    }
}
