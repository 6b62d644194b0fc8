use crate::buffer::PreConnectionBuffer;
use crate::host::SessionHost;
use crate::read_loop::ReadLoop;
use crate::session::StreamingSession;
use crate::transport::ConnectionStub;
use scribe_core::{
    ChannelVariables, ClosureClassification, ConfigError, GeneralConfig, SessionConfig,
    SessionOptions,
};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Creates recognition sessions for call legs.
pub struct SessionManager<S: ConnectionStub> {
    stub: Arc<S>,
    host: Arc<dyn SessionHost>,
    chunk_size: usize,
    buffer_chunks: usize,
    outbound_frames: usize,
}

impl<S: ConnectionStub> SessionManager<S> {
    pub fn new(stub: Arc<S>, host: Arc<dyn SessionHost>, general: &GeneralConfig) -> Self {
        Self {
            stub,
            host,
            chunk_size: general.chunk_size,
            buffer_chunks: general.buffer_chunks,
            outbound_frames: general.outbound_frames,
        }
    }

    /// Build the session config and start the read loop for one call leg.
    ///
    /// Must be called from within a tokio runtime. Fails only on
    /// configuration errors; connection failures are reported through the
    /// host once the read loop runs.
    pub fn start(
        &self,
        session_id: &str,
        options: &SessionOptions,
        vars: &impl ChannelVariables,
    ) -> Result<SessionHandle<S>, ConfigError> {
        let config = SessionConfig::build(options, vars)?;
        let session = Arc::new(
            StreamingSession::new(
                session_id,
                config,
                Arc::clone(&self.stub),
                PreConnectionBuffer::new(self.chunk_size, self.buffer_chunks),
            )
            .with_outbound_capacity(self.outbound_frames),
        );

        let read_loop = ReadLoop::new(
            Arc::clone(&session),
            Arc::clone(&self.host),
            &options.stream_tag,
            options.play_interrupt,
        );
        let task = tokio::spawn(read_loop.run());
        tracing::info!(
            session_id,
            stream_tag = %options.stream_tag,
            "recognition session started"
        );

        Ok(SessionHandle {
            session,
            read_loop: Some(task),
        })
    }
}

/// The per-leg handle held by the media pipeline.
///
/// Dropping the handle without [`stop`](Self::stop) cancels the stream and
/// aborts the read loop.
pub struct SessionHandle<S: ConnectionStub> {
    session: Arc<StreamingSession<S>>,
    read_loop: Option<JoinHandle<Option<ClosureClassification>>>,
}

impl<S: ConnectionStub> SessionHandle<S> {
    pub fn session_id(&self) -> &str {
        self.session.id()
    }

    pub fn session(&self) -> &Arc<StreamingSession<S>> {
        &self.session
    }

    /// Forward one media frame. Never blocks.
    pub fn feed_frame(&self, frame: &[u8]) -> bool {
        self.session.write(frame)
    }

    /// Tear the session down and wait for the read loop to exit.
    ///
    /// With `channel_closing` the stream is cancelled instead of being
    /// allowed to drain its remaining results.
    pub async fn stop(mut self, channel_closing: bool) -> Option<ClosureClassification> {
        self.session.writes_done();
        if channel_closing {
            self.session.cancel();
        }
        let task = self.read_loop.take()?;
        match task.await {
            Ok(classification) => {
                tracing::info!(
                    session_id = %self.session.id(),
                    closure = ?classification,
                    "recognition session stopped"
                );
                classification
            }
            Err(e) => {
                tracing::error!(session_id = %self.session.id(), "read loop failed: {e}");
                None
            }
        }
    }
}

impl<S: ConnectionStub> Drop for SessionHandle<S> {
    fn drop(&mut self) {
        if let Some(task) = self.read_loop.take() {
            self.session.cancel();
            task.abort();
        }
    }
}
