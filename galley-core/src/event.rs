use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::item::{last_segment, ItemId, ResolvedItem};

/// Local display format for history timestamps.
pub const RECORD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Who is scanning. Passed explicitly into the session and publisher.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub username: String,
    pub user_id: String,
    pub role: String,
    pub auth_token: Option<String>,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("username", &self.username)
            .field("user_id", &self.user_id)
            .field("role", &self.role)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanAction {
    #[serde(rename = "inventory_scan")]
    InventoryScan,
}

/// Body of `POST {api_base}/scanner`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanEvent {
    pub qr_code: String,
    pub item_url: String,
    pub item_name: String,
    pub item_id: ItemId,
    pub timestamp: DateTime<Local>,
    pub scanned_by: String,
    pub user_id: String,
    pub role: String,
    pub action: ScanAction,
}

impl ScanEvent {
    pub fn new(
        payload: &str,
        item: &ResolvedItem,
        ctx: &SessionContext,
        timestamp: DateTime<Local>,
    ) -> Self {
        Self {
            qr_code: payload.to_string(),
            item_url: item.url.clone(),
            item_name: item.name.clone(),
            item_id: item.id.clone(),
            timestamp,
            scanned_by: ctx.username.clone(),
            user_id: ctx.user_id.clone(),
            role: ctx.role.clone(),
            action: ScanAction::InventoryScan,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalOnlyReason {
    Offline,
    Timeout,
    Exception,
}

impl std::fmt::Display for LocalOnlyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocalOnlyReason::Offline => write!(f, "offline"),
            LocalOnlyReason::Timeout => write!(f, "timeout"),
            LocalOnlyReason::Exception => write!(f, "exception"),
        }
    }
}

/// What happened when a scan event was sent. Every variant counts as a
/// locally successful scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum PublishOutcome {
    Sent(String),
    SentWithServerError(u16),
    LocalOnly(LocalOnlyReason),
}

impl PublishOutcome {
    pub fn reached_server(&self) -> bool {
        !matches!(self, PublishOutcome::LocalOnly(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub item: ResolvedItem,
    pub publish: PublishOutcome,
}

/// One history entry. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub data: String,
    pub item_name: String,
    pub item_id: ItemId,
    pub timestamp: String,
    pub status: ScanStatus,
    pub result: Option<ScanResult>,
    pub scanned_by: String,
}

impl ScanRecord {
    pub fn success(
        payload: &str,
        item: ResolvedItem,
        publish: PublishOutcome,
        ctx: &SessionContext,
        at: DateTime<Local>,
    ) -> Self {
        Self {
            data: payload.to_string(),
            item_name: item.name.clone(),
            item_id: item.id.clone(),
            timestamp: at.format(RECORD_TIME_FORMAT).to_string(),
            status: ScanStatus::Success,
            result: Some(ScanResult { item, publish }),
            scanned_by: ctx.username.clone(),
        }
    }

    /// A detection that matched nothing in the catalog.
    pub fn failure(payload: &str, ctx: &SessionContext, at: DateTime<Local>) -> Self {
        Self {
            data: payload.to_string(),
            item_name: payload.to_string(),
            item_id: last_segment(payload),
            timestamp: at.format(RECORD_TIME_FORMAT).to_string(),
            status: ScanStatus::Failure,
            result: None,
            scanned_by: ctx.username.clone(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ScanStatus::Success
    }
}
