use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ClientConfig, ScrollSettings};
use crate::error::Result;
use crate::events::{EventSink, TracingSink};
use crate::retry::{RetryPolicy, RetryingTransport};
use crate::transport::Transport;

/// Search-engine client shared by scroll sessions and bulk writes.
///
/// The only mutable state is the scroll counter, so one `Client` can be
/// shared across tasks behind an `Arc`.
pub struct Client {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) events: Arc<dyn EventSink>,
    pub(crate) scroll: ScrollSettings,
    // Added to every scroll keep-alive so no two scroll requests are
    // byte-identical to a caching proxy
    scroll_counter: AtomicU64,
}

impl Client {
    /// Build a client over `transport`, wrapped in the configured retry
    /// policy. No request is sent.
    pub fn new<T: Transport + 'static>(config: &ClientConfig, transport: T) -> Result<Self> {
        Self::with_events(config, transport, Arc::new(TracingSink))
    }

    pub fn with_events<T: Transport + 'static>(
        config: &ClientConfig,
        transport: T,
        events: Arc<dyn EventSink>,
    ) -> Result<Self> {
        config.validate()?;

        let retrying = RetryingTransport::new(
            transport,
            RetryPolicy::from_config(config),
            events.clone(),
        );

        Ok(Self {
            transport: Arc::new(retrying),
            events,
            scroll: config.scroll.clone(),
            scroll_counter: AtomicU64::new(0),
        })
    }

    /// Current counter value; grows by one per scroll request.
    pub fn scroll_counter(&self) -> u64 {
        self.scroll_counter.load(Ordering::SeqCst)
    }

    /// Keep-alive for the next scroll request: `base` plus the bumped counter
    /// in milliseconds, formatted the way the search engine expects.
    pub(crate) fn next_keep_alive(&self, base: Duration) -> String {
        let tick = self.scroll_counter.fetch_add(1, Ordering::SeqCst) + 1;
        format_keep_alive(base + Duration::from_millis(tick))
    }
}

pub(crate) fn format_keep_alive(duration: Duration) -> String {
    format!("{}ms", duration.as_millis())
}
