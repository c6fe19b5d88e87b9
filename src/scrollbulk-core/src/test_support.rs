//! Scripted transport and recording sink shared by unit tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{ClientError, Result};
use crate::events::{ClientEvent, EventSink};
use crate::transport::{Method, Request, Response, ResponseBody, Transport};

enum Scripted {
    Reply(u16, Vec<u8>),
    IoError(String),
}

/// Replays queued replies in order and records every request it sees.
#[derive(Default)]
pub struct FakeTransport {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<Request>>,
    releases: Arc<AtomicUsize>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_status(&self, status: u16, body: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Reply(status, body.as_bytes().to_vec()));
    }

    pub fn push_io_error(&self, message: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::IoError(message.to_string()));
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn count_method(&self, method: Method) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method)
            .count()
    }

    /// Bodies dropped so far
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn perform(&self, request: &Request) -> Result<Response> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Reply(status, body)) => Ok(Response::new(
                status,
                Some(Box::new(TrackedBody::new(body, self.releases.clone()))),
            )),
            Some(Scripted::IoError(message)) => Err(ClientError::Transport(message)),
            None => Err(ClientError::Transport(format!(
                "no scripted reply for {:?} {}",
                request.method, request.path
            ))),
        }
    }
}

/// Body that counts how often it was dropped.
pub struct TrackedBody {
    bytes: Option<Vec<u8>>,
    releases: Arc<AtomicUsize>,
}

impl TrackedBody {
    pub fn new(bytes: Vec<u8>, releases: Arc<AtomicUsize>) -> Self {
        Self {
            bytes: Some(bytes),
            releases,
        }
    }
}

#[async_trait]
impl ResponseBody for TrackedBody {
    async fn read_all(&mut self) -> Result<Vec<u8>> {
        Ok(self.bytes.take().unwrap_or_default())
    }
}

impl Drop for TrackedBody {
    fn drop(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Body whose read always fails, as if the connection dropped mid-stream.
pub struct FailingBody {
    releases: Arc<AtomicUsize>,
}

impl FailingBody {
    pub fn new(releases: Arc<AtomicUsize>) -> Self {
        Self { releases }
    }
}

#[async_trait]
impl ResponseBody for FailingBody {
    async fn read_all(&mut self) -> Result<Vec<u8>> {
        Err(ClientError::Transport("connection reset".to_string()))
    }
}

impl Drop for FailingBody {
    fn drop(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ClientEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<ClientEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: ClientEvent) {
        self.events.lock().unwrap().push(event);
    }
}
