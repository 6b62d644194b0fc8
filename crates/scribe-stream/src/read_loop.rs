use crate::host::SessionHost;
use crate::session::StreamingSession;
use crate::translator::translate;
use crate::transport::{ConnectionStub, InboundMessage};
use scribe_core::types::PLAY_INTERRUPT;
use scribe_core::{
    classify, ClosureClassification, ErrorCause, RecognitionEvent, SessionError, StreamFailure,
    TransportStatus,
};
use std::sync::Arc;

/// Drives one session's inbound side: connect, translate every response
/// into host deliveries, then classify how the stream closed.
pub struct ReadLoop<S: ConnectionStub> {
    session: Arc<StreamingSession<S>>,
    host: Arc<dyn SessionHost>,
    stream_tag: String,
    play_interrupt: bool,
}

impl<S: ConnectionStub> ReadLoop<S> {
    pub fn new(
        session: Arc<StreamingSession<S>>,
        host: Arc<dyn SessionHost>,
        stream_tag: &str,
        play_interrupt: bool,
    ) -> Self {
        Self {
            session,
            host,
            stream_tag: stream_tag.to_string(),
            play_interrupt,
        }
    }

    /// Run to completion.
    ///
    /// Returns the closure classification, or `None` if the stream never
    /// connected or the call leg went away first.
    pub async fn run(self) -> Option<ClosureClassification> {
        let id = self.session.id().to_string();

        if let Err(e) = self.session.connect().await {
            tracing::warn!(session_id = %id, "read loop exiting, stream did not connect: {e}");
            if let SessionError::Connect { code, message } = e {
                let event = RecognitionEvent::StreamError(StreamFailure {
                    cause: ErrorCause::Connect,
                    status: TransportStatus::new(code, message),
                });
                if self.host.is_session_alive(&id) {
                    self.emit(&id, &event);
                }
            }
            return None;
        }

        while let Some(message) = self.session.read().await {
            if !self.host.is_session_alive(&id) {
                tracing::error!(session_id = %id, "session is gone, stopping read loop");
                return None;
            }

            if self.play_interrupt {
                self.host.deliver(&id, PLAY_INTERRUPT, &self.stream_tag);
            }

            let response = message.into_response();
            let results = response.results.len();
            for event in translate(&response) {
                self.handle(&id, event);
            }
            tracing::debug!(
                session_id = %id,
                results,
                responses = self.session.response_count(),
                "processed response"
            );
        }

        let status = match self.session.finish().await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(session_id = %id, "finish failed: {e}");
                return None;
            }
        };
        tracing::debug!(
            session_id = %id,
            code = status.code,
            "stream finished: {}",
            status.message
        );

        if !self.host.is_session_alive(&id) {
            return None;
        }
        let classification = classify(&status);
        self.emit(&id, &classification.clone().into_event());
        Some(classification)
    }

    fn handle(&self, id: &str, event: RecognitionEvent) {
        match event {
            RecognitionEvent::EndOfUtterance => {
                tracing::debug!(session_id = %id, "got end_of_utterance");
                self.session.mark_end_of_utterance();
                self.emit(id, &event);
                if self.session.is_single_utterance() {
                    tracing::debug!(
                        session_id = %id,
                        "single utterance requested, sending writes done"
                    );
                    self.session.writes_done();
                }
            }
            RecognitionEvent::SpeechActivityBegin => {
                tracing::debug!(session_id = %id, "got speech activity begin");
            }
            RecognitionEvent::SpeechActivityEnd => {
                tracing::debug!(session_id = %id, "got speech activity end");
            }
            other => self.emit(id, &other),
        }
    }

    fn emit(&self, id: &str, event: &RecognitionEvent) {
        if let Some(payload) = event.payload() {
            self.host.deliver(id, &payload, &self.stream_tag);
        }
    }
}
