use async_trait::async_trait;
use galley_core::{LocalOnlyReason, PublishOutcome, ScanEvent};
use tracing::debug;

/// Sends scan events somewhere. Implementations must not fail: anything that
/// goes wrong is folded into the returned outcome.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &ScanEvent, auth_token: Option<&str>) -> PublishOutcome;
}

/// Publisher used when no API endpoint is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflinePublisher;

#[async_trait]
impl EventPublisher for OfflinePublisher {
    async fn publish(&self, event: &ScanEvent, _auth_token: Option<&str>) -> PublishOutcome {
        debug!(qr_code = %event.qr_code, "no API configured, recording locally");
        PublishOutcome::LocalOnly(LocalOnlyReason::Offline)
    }
}

#[async_trait]
impl<P: EventPublisher + ?Sized> EventPublisher for Box<P> {
    async fn publish(&self, event: &ScanEvent, auth_token: Option<&str>) -> PublishOutcome {
        (**self).publish(event, auth_token).await
    }
}

#[async_trait]
impl<P: EventPublisher + ?Sized> EventPublisher for std::sync::Arc<P> {
    async fn publish(&self, event: &ScanEvent, auth_token: Option<&str>) -> PublishOutcome {
        (**self).publish(event, auth_token).await
    }
}
