//! Capability contracts between the streaming session and a concrete
//! recognition protocol.
//!
//! A protocol version supplies its request type ([`OutboundMessage`]), its
//! response type ([`InboundMessage`]) and a [`ConnectionStub`] that opens a
//! bidirectional stream split into a writer half and a reader half.

use crate::message::StreamingResponse;
use async_trait::async_trait;
use scribe_core::{SessionConfig, TransportStatus};

pub trait OutboundMessage: Send + 'static {
    /// The first message of a stream, carrying the session configuration.
    fn setup(config: &SessionConfig) -> Self;
    /// An audio-only message.
    fn audio(data: Vec<u8>) -> Self;
}

pub trait InboundMessage: Send + 'static {
    fn into_response(self) -> StreamingResponse;
}

#[async_trait]
pub trait StreamWriter<M: Send + 'static>: Send + 'static {
    /// Returns `false` if the transport rejected the message.
    async fn write(&mut self, message: M) -> bool;
    /// Half-close the outbound direction.
    async fn writes_done(&mut self) -> bool;
}

#[async_trait]
pub trait StreamReader<M: Send + 'static>: Send + 'static {
    /// `None` once the stream has ended, gracefully or not.
    async fn read(&mut self) -> Option<M>;
    /// Terminal status, available after `read` returned `None`.
    async fn finish(&mut self) -> TransportStatus;
}

#[async_trait]
pub trait ConnectionStub: Send + Sync + 'static {
    type Request: OutboundMessage;
    type Response: InboundMessage;
    type Writer: StreamWriter<Self::Request>;
    type Reader: StreamReader<Self::Response>;

    /// Perform the handshake and send `setup` as the first outbound message.
    async fn open(
        &self,
        setup: Self::Request,
    ) -> Result<(Self::Writer, Self::Reader), TransportStatus>;
}
