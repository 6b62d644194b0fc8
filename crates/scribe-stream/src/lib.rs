pub mod buffer;
pub mod host;
pub mod manager;
pub mod message;
pub mod read_loop;
pub mod scripted;
pub mod session;
pub mod translator;
pub mod transport;

pub use buffer::PreConnectionBuffer;
pub use host::{ChannelHost, Delivery, SessionHost};
pub use manager::{SessionHandle, SessionManager};
pub use message::{
    SpeechEventType, StreamingAlternative, StreamingRequest, StreamingResponse, StreamingResult,
    StreamingWord,
};
pub use read_loop::ReadLoop;
pub use scripted::{Script, ScriptedStub};
pub use session::{SessionState, StreamingSession};
pub use translator::translate;
pub use transport::{ConnectionStub, InboundMessage, OutboundMessage, StreamReader, StreamWriter};
