use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Backoff, ClientConfig};
use crate::error::Result;
use crate::events::{ClientEvent, EventSink};
use crate::response;
use crate::transport::{Request, Response, Transport};

/// When and how long to wait before re-issuing a request.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    retry_on_status: Vec<u16>,
    max_retries: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(retry_on_status: Vec<u16>, max_retries: u32, backoff: Backoff) -> Self {
        Self {
            retry_on_status,
            max_retries,
            backoff,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            config.retry_on_status.clone(),
            config.max_retries,
            config.backoff.clone(),
        )
    }

    pub fn is_retryable(&self, status: u16) -> bool {
        self.retry_on_status.contains(&status)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before retry `attempt`, counted from 1.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}

/// Re-issues requests answered with a retryable status.
///
/// After `max_retries` retries the last response is handed back unchanged so
/// the caller's decoder classifies it. I/O errors are returned immediately.
pub struct RetryingTransport<T> {
    inner: T,
    policy: RetryPolicy,
    events: Arc<dyn EventSink>,
}

impl<T: Transport> RetryingTransport<T> {
    pub fn new(inner: T, policy: RetryPolicy, events: Arc<dyn EventSink>) -> Self {
        Self {
            inner,
            policy,
            events,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<T: Transport> Transport for RetryingTransport<T> {
    async fn perform(&self, request: &Request) -> Result<Response> {
        let mut attempt = 0;
        loop {
            let response = self.inner.perform(request).await?;
            let status = response.status();

            if !self.policy.is_retryable(status) || attempt >= self.policy.max_retries {
                return Ok(response);
            }

            response::release(Some(response));
            attempt += 1;
            let delay = self.policy.delay(attempt);
            self.events.emit(ClientEvent::RetryBackoff {
                attempt,
                delay,
                status,
            });
            tokio::time::sleep(delay).await;
        }
    }
}
