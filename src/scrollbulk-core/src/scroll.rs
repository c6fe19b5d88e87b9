//! Exhaustive pagination through the scroll API.
//!
//! A session opens a search with a scroll keep-alive, hands each non-empty
//! page to the caller, and clears the server-side cursor when it is done,
//! whether it finished normally or failed.

use serde::de::IgnoredAny;
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use tracing::debug;

use crate::client::Client;
use crate::error::{ClientError, Result};
use crate::events::ClientEvent;
use crate::response;
use crate::transport::{index_path, Method, Request};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollState {
    Opening,
    Paging,
    Draining,
    Closed,
    Failed,
}

/// Opaque server-issued cursor. Clearing it consumes it.
#[derive(Clone, PartialEq, Eq)]
pub struct ScrollId(String);

impl ScrollId {
    /// `None` for an absent or blank id.
    pub fn parse(raw: Option<String>) -> Option<Self> {
        raw.filter(|id| !id.trim().is_empty()).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ScrollId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Ids run to kilobytes
        let shown: String = self.0.chars().take(16).collect();
        write!(f, "ScrollId({}..)", shown)
    }
}

#[derive(Deserialize)]
struct PageEnvelope {
    #[serde(rename = "_scroll_id", default)]
    scroll_id: Option<String>,
    #[serde(default)]
    hits: PageHits,
}

#[derive(Deserialize, Default)]
struct PageHits {
    #[serde(default)]
    hits: Vec<IgnoredAny>,
}

struct Page {
    body: Vec<u8>,
    hits: usize,
    scroll_id: Option<ScrollId>,
}

impl Page {
    fn parse(body: Vec<u8>) -> Result<Self> {
        let envelope: PageEnvelope = serde_json::from_slice(&body).map_err(|e| {
            ClientError::ScrollProtocol(format!("malformed search page: {}", e))
        })?;

        Ok(Self {
            hits: envelope.hits.hits.len(),
            scroll_id: ScrollId::parse(envelope.scroll_id),
            body,
        })
    }
}

struct ScrollSession<'c, F> {
    client: &'c Client,
    handler: F,
    state: ScrollState,
    cursor: Option<ScrollId>,
    pages: usize,
}

impl<'c, F> ScrollSession<'c, F>
where
    F: FnMut(&[u8]) -> anyhow::Result<()> + Send,
{
    fn new(client: &'c Client, handler: F) -> Self {
        Self {
            client,
            handler,
            state: ScrollState::Opening,
            cursor: None,
            pages: 0,
        }
    }

    fn transition(&mut self, next: ScrollState) {
        debug!("Scroll session {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    async fn run(mut self, index: &str, query: &[u8]) -> Result<()> {
        let outcome = self.page_through(index, query).await;

        if let Some(cursor) = self.cursor.take() {
            if outcome.is_ok() {
                self.transition(ScrollState::Draining);
            }
            self.clear(cursor).await;
        }

        self.transition(if outcome.is_ok() {
            ScrollState::Closed
        } else {
            ScrollState::Failed
        });
        outcome
    }

    async fn page_through(&mut self, index: &str, query: &[u8]) -> Result<()> {
        let first = self.open(index, query).await?;
        self.transition(ScrollState::Paging);

        if first.hits == 0 {
            return Ok(());
        }
        self.deliver(&first)?;

        if self.cursor.is_none() {
            return Ok(());
        }

        loop {
            tokio::time::sleep(self.client.scroll.step_delay()).await;

            let page = self.fetch_next().await?;
            if page.hits == 0 {
                return Ok(());
            }
            self.deliver(&page)?;
        }
    }

    async fn open(&mut self, index: &str, query: &[u8]) -> Result<Page> {
        let settings = &self.client.scroll;
        let request = Request::new(Method::Post, index_path(index, "_search"))
            .query("size", settings.page_size.to_string())
            .query(
                "scroll",
                self.client.next_keep_alive(settings.open_keep_alive()),
            )
            .json_body(query.to_vec());

        let response = self.client.transport.perform(&request).await?;
        let page = Page::parse(response::decode(response).await?)?;

        self.cursor = page.scroll_id.clone();
        self.client.events.emit(ClientEvent::ScrollOpened {
            index: index.to_string(),
            hits: page.hits,
        });
        Ok(page)
    }

    async fn fetch_next(&mut self) -> Result<Page> {
        let cursor = self
            .cursor
            .as_ref()
            .ok_or_else(|| ClientError::ScrollProtocol("no live scroll id".to_string()))?;

        let body = serde_json::to_vec(&json!({ "scroll_id": cursor.as_str() }))?;
        let request = Request::new(Method::Post, "/_search/scroll")
            .query(
                "scroll",
                self.client
                    .next_keep_alive(self.client.scroll.continue_keep_alive()),
            )
            .json_body(body);

        let response = self.client.transport.perform(&request).await?;
        let page = Page::parse(response::decode(response).await?)?;

        // The server may hand out a new id; only the latest one is live
        if let Some(next) = &page.scroll_id {
            if self.cursor.as_ref() != Some(next) {
                self.cursor = Some(next.clone());
            }
        }
        Ok(page)
    }

    fn deliver(&mut self, page: &Page) -> Result<()> {
        (self.handler)(&page.body).map_err(ClientError::Handler)?;
        self.pages += 1;
        self.client.events.emit(ClientEvent::PageDelivered {
            page: self.pages,
            hits: page.hits,
        });
        Ok(())
    }

    /// Best effort: failures are reported to the event sink and never change
    /// the session outcome. A 404 means the cursor is already gone.
    async fn clear(&self, cursor: ScrollId) {
        let outcome = match serde_json::to_vec(&json!({ "scroll_id": [cursor.as_str()] })) {
            Ok(body) => {
                let request = Request::new(Method::Delete, "/_search/scroll").json_body(body);
                match self.client.transport.perform(&request).await {
                    Ok(response) => response::decode(response).await.map(|_| ()),
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e.into()),
        };

        match outcome {
            Ok(()) | Err(ClientError::Status { status: 404, .. }) => {
                self.client.events.emit(ClientEvent::ScrollCleared)
            }
            Err(e) => self.client.events.emit(ClientEvent::ScrollClearFailed {
                error: e.to_string(),
            }),
        }
    }
}

impl Client {
    /// Page through every document matching `query` in `index`.
    ///
    /// `handler` receives the raw JSON of each page that has at least one
    /// hit, one page at a time. A handler error stops the session and is
    /// returned as [`ClientError::Handler`]. The cursor is cleared before
    /// returning in every case where one was issued.
    ///
    /// Dropping the returned future abandons the cursor; the server expires
    /// it after its keep-alive window.
    pub async fn scroll_all_documents<F>(&self, index: &str, query: &[u8], handler: F) -> Result<()>
    where
        F: FnMut(&[u8]) -> anyhow::Result<()> + Send,
    {
        ScrollSession::new(self, handler).run(index, query).await
    }
}
