use anyhow::{Context, Result};
use scrollbulk_core::{BulkPayload, Client, ClientError};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{info, warn};

pub const DEFAULT_BATCH_SIZE: usize = 1000;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    pub batches: usize,
    pub accepted: usize,
    pub rejected: usize,
}

/// Read `file` line by line and bulk-load it into `index`.
///
/// Item-level rejections are logged and counted, then ingestion continues.
/// Any other error aborts the run.
pub async fn run(
    client: &Client,
    index: &str,
    file: &Path,
    batch_size: usize,
    id_field: Option<&str>,
) -> Result<IngestSummary> {
    let reader = BufReader::new(
        File::open(file).with_context(|| format!("Failed to open {}", file.display()))?,
    );
    let batch_size = batch_size.max(1);
    let mut payload = BulkPayload::new();
    let mut summary = IngestSummary::default();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let document: serde_json::Value = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid JSON", file.display(), line_no + 1))?;
        let id = document_id(&document, id_field);
        payload.index(id.as_deref(), &document)?;

        if payload.len() >= batch_size {
            flush(client, index, &mut payload, &mut summary).await?;
        }
    }

    if !payload.is_empty() {
        flush(client, index, &mut payload, &mut summary).await?;
    }

    Ok(summary)
}

async fn flush(
    client: &Client,
    index: &str,
    payload: &mut BulkPayload,
    summary: &mut IngestSummary,
) -> Result<()> {
    let documents = payload.len();
    summary.batches += 1;

    match client.bulk_write(payload.as_bytes(), index).await {
        Ok(()) => summary.accepted += documents,
        Err(ClientError::Bulk(err)) => {
            let rejected = err.failed_items().len();
            for failure in err.failed_items() {
                warn!("Rejected: {}", failure);
            }
            summary.rejected += rejected;
            summary.accepted += documents.saturating_sub(rejected);
        }
        Err(e) => {
            return Err(e).with_context(|| {
                format!("Bulk request {} to {} failed", summary.batches, index)
            })
        }
    }

    info!(
        "Batch {}: {} documents ({} bytes)",
        summary.batches,
        documents,
        payload.byte_len()
    );
    payload.clear();
    Ok(())
}

/// `_id` taken from `field` when it is a string or number.
fn document_id(document: &serde_json::Value, field: Option<&str>) -> Option<String> {
    match document.get(field?)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_id() {
        let doc = json!({ "address": "erd1", "nonce": 7, "tags": ["a"] });
        assert_eq!(document_id(&doc, Some("address")).as_deref(), Some("erd1"));
        assert_eq!(document_id(&doc, Some("nonce")).as_deref(), Some("7"));
        assert_eq!(document_id(&doc, Some("tags")), None);
        assert_eq!(document_id(&doc, Some("missing")), None);
        assert_eq!(document_id(&doc, None), None);
    }
}
