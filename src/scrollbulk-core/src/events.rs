//! Observability hooks for retries, scroll progress and cleanup.
//!
//! Components never log through a global; they are handed an [`EventSink`].
//! [`TracingSink`] forwards everything to `tracing`.

use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// A retryable status was received and the request will be re-issued
    RetryBackoff {
        attempt: u32,
        delay: Duration,
        status: u16,
    },
    ScrollOpened { index: String, hits: usize },
    PageDelivered { page: usize, hits: usize },
    ScrollCleared,
    /// Clearing the cursor failed; the server will expire it on its own
    ScrollClearFailed { error: String },
    BulkItemsFailed {
        index: String,
        failed: usize,
        total: usize,
    },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: ClientEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: ClientEvent) {
        match event {
            ClientEvent::RetryBackoff {
                attempt,
                delay,
                status,
            } => {
                info!(
                    attempt,
                    status,
                    sleep_ms = delay.as_millis() as u64,
                    "elastic: retry backoff"
                );
            }
            ClientEvent::ScrollOpened { index, hits } => {
                debug!("Scroll opened on {} ({} hits in first page)", index, hits);
            }
            ClientEvent::PageDelivered { page, hits } => {
                debug!("Scroll page {} delivered ({} hits)", page, hits);
            }
            ClientEvent::ScrollCleared => debug!("Scroll cleared"),
            ClientEvent::ScrollClearFailed { error } => {
                warn!(error = %error, "cannot clear scroll");
            }
            ClientEvent::BulkItemsFailed {
                index,
                failed,
                total,
            } => {
                warn!("Bulk write to {}: {} of {} items failed", index, failed, total);
            }
        }
    }
}
