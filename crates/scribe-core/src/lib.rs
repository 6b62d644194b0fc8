pub mod closure;
pub mod config;
pub mod error;
pub mod hints;
pub mod session_config;
pub mod types;

pub use closure::{classify, DURATION_LIMIT_CODE, MAX_DURATION_PHRASE};
pub use config::{AppConfig, ChannelVariables, GeneralConfig, SessionOptions};
pub use error::{ConfigError, SessionError};
pub use hints::PhraseHint;
pub use session_config::{
    DiarizationBounds, NormalizationEntry, RecognitionConfig, SessionConfig, StreamingFeatures,
};
pub use types::{
    Alternative, AudioChunk, ClosureClassification, ErrorCause, Offset, RecognitionEvent,
    RecognitionResult, StreamFailure, TransportStatus, WordInfo,
};
