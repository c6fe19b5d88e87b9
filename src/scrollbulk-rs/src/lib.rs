//! scrollbulk Client Library
//!
//! HTTP transport for talking to an Elasticsearch-compatible server, and
//! [`connect`], which builds a ready-to-use [`Client`] from a
//! [`ClientConfig`].

mod transport;

use std::sync::Arc;

pub use scrollbulk_core::{
    Backoff, BulkError, BulkItemFailure, BulkPayload, Client, ClientConfig, ClientError,
    ClientEvent, EventSink, Result, ScrollSettings, TracingSink,
};
pub use transport::HttpTransport;

/// Build a client for `config.url` with retry on the configured statuses.
///
/// Fails with [`ClientError::Connection`] on an unusable configuration.
/// Nothing is sent to the server.
pub fn connect(config: &ClientConfig) -> Result<Client> {
    connect_with_events(config, Arc::new(TracingSink))
}

pub fn connect_with_events(config: &ClientConfig, events: Arc<dyn EventSink>) -> Result<Client> {
    let transport = HttpTransport::new(config)?;
    tracing::debug!("Connecting to {}", transport.base_url());
    Client::with_events(config, transport, events)
}
