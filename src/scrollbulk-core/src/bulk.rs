//! Bulk writes and per-item failure extraction.
//!
//! The bulk endpoint answers 200 even when some documents were rejected; the
//! `errors` flag in the body is the only signal. A [`BulkError`] carries the
//! rejected items so callers can retry or skip them.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::fmt;

use crate::client::Client;
use crate::error::Result;
use crate::events::ClientEvent;
use crate::response;
use crate::transport::{index_path, Method, Request};

/// Failures shown in the error message before the rest are summarised.
const MAX_LISTED_FAILURES: usize = 10;

#[derive(Debug, Deserialize)]
pub struct BulkResponse {
    #[serde(default)]
    pub took: u64,
    pub errors: bool,
    /// One map per action, keyed by the action name (`index`, `create`, ...)
    #[serde(default)]
    pub items: Vec<HashMap<String, BulkItem>>,
}

#[derive(Debug, Deserialize)]
pub struct BulkItem {
    #[serde(rename = "_index", default)]
    pub index: Option<String>,
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub error: Option<BulkItemErrorCause>,
}

#[derive(Debug, Deserialize)]
pub struct BulkItemErrorCause {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemFailure {
    /// Position of the action in the submitted batch
    pub position: usize,
    pub action: String,
    pub index: Option<String>,
    pub id: Option<String>,
    pub status: u16,
    pub error_type: String,
    pub reason: String,
}

impl fmt::Display for BulkItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} {}/{} (status {}): {}: {}",
            self.position,
            self.action,
            self.index.as_deref().unwrap_or("-"),
            self.id.as_deref().unwrap_or("-"),
            self.status,
            self.error_type,
            self.reason
        )
    }
}

/// The server accepted the batch but rejected some of its items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkError {
    failed: Vec<BulkItemFailure>,
    total: usize,
}

impl BulkError {
    pub fn from_response(response: &BulkResponse) -> Self {
        let failed = response
            .items
            .iter()
            .enumerate()
            .flat_map(|(position, item)| {
                item.iter().filter_map(move |(action, result)| {
                    let cause = result.error.as_ref()?;
                    Some(BulkItemFailure {
                        position,
                        action: action.clone(),
                        index: result.index.clone(),
                        id: result.id.clone(),
                        status: result.status,
                        error_type: cause.kind.clone(),
                        reason: cause.reason.clone().unwrap_or_default(),
                    })
                })
            })
            .collect();

        Self {
            failed,
            total: response.items.len(),
        }
    }

    pub fn failed_items(&self) -> &[BulkItemFailure] {
        &self.failed
    }

    pub fn total_items(&self) -> usize {
        self.total
    }
}

impl fmt::Display for BulkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failed.is_empty() {
            return write!(
                f,
                "bulk request reported errors without item details ({} items)",
                self.total
            );
        }

        write!(
            f,
            "bulk request rejected {} of {} items: ",
            self.failed.len(),
            self.total
        )?;
        for (i, failure) in self.failed.iter().take(MAX_LISTED_FAILURES).enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", failure)?;
        }
        if self.failed.len() > MAX_LISTED_FAILURES {
            write!(f, "; and {} more", self.failed.len() - MAX_LISTED_FAILURES)?;
        }
        Ok(())
    }
}

impl std::error::Error for BulkError {}

/// Newline-delimited bulk body: one action line and one source line per
/// document.
#[derive(Debug, Default, Clone)]
pub struct BulkPayload {
    buffer: Vec<u8>,
    documents: usize,
}

impl BulkPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an `index` action. The target index comes from the request
    /// path, so only the optional `_id` goes in the action line.
    pub fn index<T: Serialize + ?Sized>(&mut self, id: Option<&str>, document: &T) -> Result<()> {
        let action = match id {
            Some(id) => json!({ "index": { "_id": id } }),
            None => json!({ "index": {} }),
        };
        // Serialise both before touching the buffer so a failure leaves it intact
        let action = serde_json::to_vec(&action)?;
        let source = serde_json::to_vec(document)?;

        self.buffer.extend_from_slice(&action);
        self.buffer.push(b'\n');
        self.buffer.extend_from_slice(&source);
        self.buffer.push(b'\n');
        self.documents += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.documents
    }

    pub fn is_empty(&self) -> bool {
        self.documents == 0
    }

    pub fn byte_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.documents = 0;
    }
}

impl Client {
    /// Send a pre-encoded NDJSON batch to `index`.
    ///
    /// An error status comes back as [`ClientError::Status`] without looking
    /// at the body. A 200 whose `errors` flag is set comes back as
    /// [`ClientError::Bulk`].
    ///
    /// [`ClientError::Status`]: crate::error::ClientError::Status
    /// [`ClientError::Bulk`]: crate::error::ClientError::Bulk
    pub async fn bulk_write(&self, payload: &[u8], index: &str) -> Result<()> {
        let request =
            Request::new(Method::Post, index_path(index, "_bulk")).ndjson_body(payload.to_vec());

        let response = self.transport.perform(&request).await?;
        let body = response::decode(response).await?;

        let parsed: BulkResponse = serde_json::from_slice(&body)?;
        if !parsed.errors {
            return Ok(());
        }

        let err = BulkError::from_response(&parsed);
        self.events.emit(ClientEvent::BulkItemsFailed {
            index: index.to_string(),
            failed: err.failed_items().len(),
            total: err.total_items(),
        });
        Err(err.into())
    }
}
