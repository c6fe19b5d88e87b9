//! scrollbulk Core Library
//!
//! Client layer for bulk export and ingestion against an
//! Elasticsearch-compatible search engine:
//! - Transport capability and retry/backoff policy
//! - Response decoding with scoped body release
//! - Scroll pagination over unbounded result sets
//! - Bulk writes with per-item failure detection
//!
//! The HTTP transport itself lives in `scrollbulk-rs`.

pub mod bulk;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod response;
pub mod retry;
pub mod scroll;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use bulk::{BulkError, BulkItemFailure, BulkPayload, BulkResponse};
pub use client::Client;
pub use config::{Backoff, ClientConfig, ScrollSettings};
pub use error::{ClientError, Result};
pub use events::{ClientEvent, EventSink, TracingSink};
pub use retry::{RetryPolicy, RetryingTransport};
pub use scroll::{ScrollId, ScrollState};
pub use transport::{Method, Request, Response, ResponseBody, Transport};
