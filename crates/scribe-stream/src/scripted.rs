//! An in-memory [`ConnectionStub`] that replays a fixed script of responses.

use crate::message::{StreamingRequest, StreamingResponse};
use crate::transport::{ConnectionStub, StreamReader, StreamWriter};
use async_trait::async_trait;
use scribe_core::TransportStatus;
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Script {
    /// Fail the handshake with this status.
    #[serde(default)]
    pub connect_error: Option<TransportStatus>,

    #[serde(default)]
    pub responses: Vec<StreamingResponse>,

    /// Status returned by `finish()`.
    #[serde(default)]
    pub status: TransportStatus,

    /// Keep the inbound side open until the client half-closes, like a live
    /// service would.
    #[serde(default)]
    pub wait_for_writes_done: bool,

    /// Reject every write after this many have been accepted.
    #[serde(default)]
    pub fail_writes_after: Option<usize>,
}

pub struct ScriptedStub {
    script: Script,
    sent: Arc<Mutex<Vec<StreamingRequest>>>,
    writes_done: Arc<AtomicUsize>,
}

impl ScriptedStub {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            sent: Arc::new(Mutex::new(Vec::new())),
            writes_done: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Every request the client has sent, setup message included.
    pub fn sent(&self) -> Vec<StreamingRequest> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn writes_done_count(&self) -> usize {
        self.writes_done.load(Ordering::SeqCst)
    }
}

pub struct ScriptedWriter {
    sent: Arc<Mutex<Vec<StreamingRequest>>>,
    writes_done: Arc<AtomicUsize>,
    done_tx: watch::Sender<bool>,
    accepted: usize,
    fail_after: Option<usize>,
}

pub struct ScriptedReader {
    responses: VecDeque<StreamingResponse>,
    status: TransportStatus,
    done_rx: Option<watch::Receiver<bool>>,
}

#[async_trait]
impl ConnectionStub for ScriptedStub {
    type Request = StreamingRequest;
    type Response = StreamingResponse;
    type Writer = ScriptedWriter;
    type Reader = ScriptedReader;

    async fn open(
        &self,
        setup: StreamingRequest,
    ) -> Result<(ScriptedWriter, ScriptedReader), TransportStatus> {
        if let Some(status) = self.script.connect_error.clone() {
            return Err(status);
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(setup);
        }

        let (done_tx, done_rx) = watch::channel(false);
        let writer = ScriptedWriter {
            sent: Arc::clone(&self.sent),
            writes_done: Arc::clone(&self.writes_done),
            done_tx,
            accepted: 0,
            fail_after: self.script.fail_writes_after,
        };
        let reader = ScriptedReader {
            responses: self.script.responses.iter().cloned().collect(),
            status: self.script.status.clone(),
            done_rx: self.script.wait_for_writes_done.then_some(done_rx),
        };
        Ok((writer, reader))
    }
}

#[async_trait]
impl StreamWriter<StreamingRequest> for ScriptedWriter {
    async fn write(&mut self, message: StreamingRequest) -> bool {
        if self.fail_after.is_some_and(|limit| self.accepted >= limit) {
            return false;
        }
        self.accepted += 1;
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message);
        }
        true
    }

    async fn writes_done(&mut self) -> bool {
        self.writes_done.fetch_add(1, Ordering::SeqCst);
        self.done_tx.send_replace(true);
        true
    }
}

#[async_trait]
impl StreamReader<StreamingResponse> for ScriptedReader {
    async fn read(&mut self) -> Option<StreamingResponse> {
        if let Some(response) = self.responses.pop_front() {
            return Some(response);
        }
        if let Some(done_rx) = self.done_rx.as_mut() {
            // A dropped writer also ends the stream.
            while !*done_rx.borrow_and_update() {
                if done_rx.changed().await.is_err() {
                    break;
                }
            }
        }
        None
    }

    async fn finish(&mut self) -> TransportStatus {
        self.status.clone()
    }
}
