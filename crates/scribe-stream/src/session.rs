use crate::buffer::PreConnectionBuffer;
use crate::transport::{ConnectionStub, OutboundMessage, StreamReader, StreamWriter};
use scribe_core::{SessionConfig, SessionError, TransportStatus};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Default number of frames queued for the transport once connected.
pub const DEFAULT_OUTBOUND_FRAMES: usize = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    WritesDone,
    Finished,
}

// Guards the connect transition against concurrent writes.
struct WriteGate<M> {
    state: SessionState,
    buffer: PreConnectionBuffer,
    outbound: Option<mpsc::Sender<M>>,
}

/// One bidirectional recognition stream.
///
/// `write` and `writes_done` are synchronous and never block, so they can be
/// called from a real-time audio thread. `connect`, `read` and `finish` are
/// driven by the read loop.
pub struct StreamingSession<S: ConnectionStub> {
    id: String,
    config: SessionConfig,
    stub: Arc<S>,
    gate: Mutex<WriteGate<S::Request>>,
    reader: tokio::sync::Mutex<Option<S::Reader>>,
    writer_task: Mutex<Option<JoinHandle<()>>>,
    outbound_frames: usize,
    writes_done: Arc<AtomicBool>,
    write_failed: Arc<AtomicBool>,
    end_of_utterance: AtomicBool,
    response_count: AtomicU64,
    dropped_frames: AtomicU64,
    cancel_tx: watch::Sender<bool>,
}

impl<S: ConnectionStub> StreamingSession<S> {
    pub fn new(id: &str, config: SessionConfig, stub: Arc<S>, buffer: PreConnectionBuffer) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self {
            id: id.to_string(),
            config,
            stub,
            gate: Mutex::new(WriteGate {
                state: SessionState::Disconnected,
                buffer,
                outbound: None,
            }),
            reader: tokio::sync::Mutex::new(None),
            writer_task: Mutex::new(None),
            outbound_frames: DEFAULT_OUTBOUND_FRAMES,
            writes_done: Arc::new(AtomicBool::new(false)),
            write_failed: Arc::new(AtomicBool::new(false)),
            end_of_utterance: AtomicBool::new(false),
            response_count: AtomicU64::new(0),
            dropped_frames: AtomicU64::new(0),
            cancel_tx,
        }
    }

    /// Limit the frames queued for the transport after connecting.
    pub fn with_outbound_capacity(mut self, frames: usize) -> Self {
        self.outbound_frames = frames.max(1);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        match self.gate.lock() {
            Ok(gate) => gate.state,
            Err(poisoned) => poisoned.into_inner().state,
        }
    }

    pub fn is_single_utterance(&self) -> bool {
        self.config.single_utterance
    }

    pub fn got_end_of_utterance(&self) -> bool {
        self.end_of_utterance.load(Ordering::Acquire)
    }

    pub fn mark_end_of_utterance(&self) {
        self.end_of_utterance.store(true, Ordering::Release);
    }

    pub fn response_count(&self) -> u64 {
        self.response_count.load(Ordering::Relaxed)
    }

    /// Frames dropped because the outbound queue was full.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    /// Open the stream, send the configuration, then flush buffered audio.
    pub async fn connect(&self) -> Result<(), SessionError> {
        {
            let mut gate = self.lock_gate();
            match gate.state {
                SessionState::Disconnected => gate.state = SessionState::Connecting,
                SessionState::Finished => return Err(SessionError::Finished),
                _ => return Err(SessionError::AlreadyConnected),
            }
        }

        tracing::debug!(session_id = %self.id, recognizer = %self.config.recognizer, "connecting");
        let setup = S::Request::setup(&self.config);
        let (writer, reader) = match self.stub.open(setup).await {
            Ok(halves) => halves,
            Err(status) => {
                let mut gate = self.lock_gate();
                gate.state = SessionState::Finished;
                let discarded = gate.buffer.drain_all().len();
                tracing::warn!(
                    session_id = %self.id,
                    code = status.code,
                    discarded,
                    "connect failed: {}",
                    status.message
                );
                return Err(SessionError::Connect {
                    code: status.code,
                    message: status.message,
                });
            }
        };

        *self.reader.lock().await = Some(reader);

        let mut gate = self.lock_gate();
        let buffered = gate.buffer.drain_all();
        let flushed = buffered.len();
        let (tx, rx) = mpsc::channel(self.outbound_frames.max(flushed));
        for chunk in buffered {
            let _ = tx.try_send(S::Request::audio(chunk.data));
        }

        let task = tokio::spawn(pump_outbound(
            self.id.clone(),
            writer,
            rx,
            Arc::clone(&self.writes_done),
            Arc::clone(&self.write_failed),
        ));
        if let Ok(mut slot) = self.writer_task.lock() {
            *slot = Some(task);
        }

        // Writes-done is signalled by closing the queue.
        if self.writes_done.load(Ordering::Acquire) {
            gate.state = SessionState::WritesDone;
        } else {
            gate.state = SessionState::Connected;
            gate.outbound = Some(tx);
        }
        tracing::info!(session_id = %self.id, flushed, "connected");
        Ok(())
    }

    /// Hand audio to the session. Never blocks.
    ///
    /// Before the stream is connected audio is buffered and this always
    /// returns `true`. Afterwards it returns `false` once a write has failed
    /// or writes-done has been signalled. A frame that finds the outbound
    /// queue full is dropped.
    pub fn write(&self, data: &[u8]) -> bool {
        let Ok(mut gate) = self.gate.lock() else {
            return false;
        };
        match gate.state {
            SessionState::Disconnected | SessionState::Connecting => {
                gate.buffer.admit(data);
                true
            }
            SessionState::Connected => {
                if self.write_failed.load(Ordering::Acquire) {
                    return false;
                }
                let Some(tx) = gate.outbound.as_ref() else {
                    return false;
                };
                match tx.try_send(S::Request::audio(data.to_vec())) {
                    Ok(()) => true,
                    Err(TrySendError::Full(_)) => {
                        let dropped = self.dropped_frames.fetch_add(1, Ordering::Relaxed) + 1;
                        if dropped.is_power_of_two() {
                            tracing::warn!(
                                session_id = %self.id,
                                dropped,
                                "outbound queue full, dropping audio"
                            );
                        }
                        true
                    }
                    Err(TrySendError::Closed(_)) => false,
                }
            }
            SessionState::WritesDone | SessionState::Finished => false,
        }
    }

    /// Signal that no more audio will be sent. Only the first call has an effect.
    pub fn writes_done(&self) {
        if self.writes_done.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut gate = self.lock_gate();
        if gate.state == SessionState::Connected {
            gate.outbound = None;
            gate.state = SessionState::WritesDone;
        }
        tracing::debug!(session_id = %self.id, "writes done");
    }

    pub fn is_writes_done(&self) -> bool {
        self.writes_done.load(Ordering::Acquire)
    }

    /// Abort the stream, unblocking a pending `read`.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
        self.lock_gate().outbound = None;
        tracing::debug!(session_id = %self.id, "cancelled");
    }

    /// Next inbound message, or `None` once the stream has ended or the
    /// session was cancelled. Only the read loop calls this.
    pub async fn read(&self) -> Option<S::Response> {
        if self.is_cancelled() {
            return None;
        }
        let cancelled = self.cancel_tx.subscribe();
        let mut guard = self.reader.lock().await;
        let reader = guard.as_mut()?;
        let message = tokio::select! {
            message = reader.read() => message,
            _ = wait_cancelled(cancelled) => None,
        };
        if message.is_some() {
            self.response_count.fetch_add(1, Ordering::Relaxed);
        }
        message
    }

    /// Close both directions and return the terminal status.
    pub async fn finish(&self) -> Result<TransportStatus, SessionError> {
        let reader = self.reader.lock().await.take();
        let Some(mut reader) = reader else {
            return Err(SessionError::Finished);
        };

        let status = if self.is_cancelled() {
            drop(reader);
            TransportStatus::cancelled()
        } else {
            reader.finish().await
        };

        self.lock_gate().outbound = None;
        let task = self.writer_task.lock().ok().and_then(|mut slot| slot.take());
        if let Some(task) = task {
            if self.is_cancelled() {
                task.abort();
            }
            let _ = task.await;
        }

        self.lock_gate().state = SessionState::Finished;
        tracing::debug!(
            session_id = %self.id,
            code = status.code,
            responses = self.response_count(),
            dropped = self.dropped_frames(),
            "finished: {}",
            status.message
        );
        Ok(status)
    }

    fn lock_gate(&self) -> std::sync::MutexGuard<'_, WriteGate<S::Request>> {
        match self.gate.lock() {
            Ok(gate) => gate,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

async fn wait_cancelled(mut cancelled: watch::Receiver<bool>) {
    while !*cancelled.borrow_and_update() {
        if cancelled.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

// Sends queued audio until the queue closes, then half-closes the stream if
// writes-done was requested.
async fn pump_outbound<M, W>(
    session_id: String,
    mut writer: W,
    mut rx: mpsc::Receiver<M>,
    writes_done: Arc<AtomicBool>,
    write_failed: Arc<AtomicBool>,
) where
    M: Send + 'static,
    W: StreamWriter<M>,
{
    while let Some(message) = rx.recv().await {
        if !writer.write(message).await {
            tracing::warn!(session_id = %session_id, "write rejected by transport");
            write_failed.store(true, Ordering::Release);
            return;
        }
    }
    if writes_done.load(Ordering::Acquire) {
        writer.writes_done().await;
    }
}
