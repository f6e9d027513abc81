//! Scan event publishing for galley inventory scanning.
//!
//! Events go to `POST {api_base}/scanner`. Publishing never fails from the
//! caller's point of view: network trouble degrades to
//! [`PublishOutcome::LocalOnly`](galley_core::PublishOutcome) and the scan is
//! still recorded locally.
//!
//! # Example
//!
//! ```ignore
//! use galley_api::{EventPublisher, HttpPublisher};
//!
//! let publisher = HttpPublisher::new("https://api.example.com/api")?;
//! let outcome = publisher.publish(&event, ctx.auth_token.as_deref()).await;
//! ```

mod client;
mod error;
mod publisher;

pub use client::{DEFAULT_TIMEOUT, HttpPublisher};
pub use error::PublishError;
pub use publisher::{EventPublisher, OfflinePublisher};
