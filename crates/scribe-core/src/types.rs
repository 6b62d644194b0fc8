use serde::{Deserialize, Serialize};

/// Literal payload emitted before each inbound message when playback
/// interruption is enabled for the call leg.
pub const PLAY_INTERRUPT: &str = "play_interrupt";
pub const END_OF_UTTERANCE: &str = "end_of_utterance";
pub const MAX_DURATION_EXCEEDED: &str = "max_duration_exceeded";
pub const NO_AUDIO: &str = "no_audio";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    pub data: Vec<u8>,
}

/// A seconds + nanoseconds offset as reported by the recognition service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offset {
    #[serde(default)]
    pub seconds: i64,
    #[serde(default)]
    pub nanos: i32,
}

impl Offset {
    pub fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }

    /// Whole milliseconds, truncated toward zero.
    pub fn as_millis(&self) -> i64 {
        self.seconds * 1000 + i64::from(self.nanos) / 1_000_000
    }
}

/// Terminal status of a stream: a transport code and its message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportStatus {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

impl TransportStatus {
    pub const OK: i32 = 0;
    pub const CANCELLED: i32 = 1;

    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn ok() -> Self {
        Self::default()
    }

    pub fn cancelled() -> Self {
        Self::new(Self::CANCELLED, "stream cancelled")
    }

    pub fn is_ok(&self) -> bool {
        self.code == Self::OK
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordInfo {
    pub word: String,
    /// Whole seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_offset: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_offset: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alternative {
    pub confidence: f32,
    pub transcript: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub words: Vec<WordInfo>,
}

impl Alternative {
    /// Placeholder used when the service returns a result with no alternatives.
    pub fn empty() -> Self {
        Self {
            confidence: 0.0,
            transcript: String::new(),
            words: Vec::new(),
        }
    }
}

/// A normalized recognition result. Field order matches the callback payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognitionResult {
    pub stability: f32,
    pub is_final: bool,
    /// Never empty.
    pub alternatives: Vec<Alternative>,
    pub language_code: String,
    pub channel_tag: i32,
    /// Milliseconds.
    pub result_end_time: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCause {
    StreamClose,
    Connect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFailure {
    pub cause: ErrorCause,
    pub status: TransportStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClosureClassification {
    Normal,
    MaxDurationExceeded,
    NoAudioReceived,
    TransportError { code: i32, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEvent {
    Result(RecognitionResult),
    SpeechActivityBegin,
    SpeechActivityEnd,
    EndOfUtterance,
    StreamError(StreamFailure),
    StreamEnd(ClosureClassification),
}

#[derive(Serialize)]
struct ErrorPayload<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    error_cause: ErrorCause,
    error_code: i32,
    error_message: &'a str,
}

impl RecognitionEvent {
    /// Renders the event as the string handed to the host callback.
    ///
    /// Speech-activity markers and a clean stream end have no payload.
    pub fn payload(&self) -> Option<String> {
        match self {
            RecognitionEvent::Result(result) => to_json(result),
            RecognitionEvent::EndOfUtterance => Some(END_OF_UTTERANCE.to_string()),
            RecognitionEvent::StreamError(failure) => to_json(&ErrorPayload {
                kind: "error",
                error_cause: failure.cause,
                error_code: failure.status.code,
                error_message: &failure.status.message,
            }),
            RecognitionEvent::StreamEnd(ClosureClassification::MaxDurationExceeded) => {
                Some(MAX_DURATION_EXCEEDED.to_string())
            }
            RecognitionEvent::StreamEnd(ClosureClassification::NoAudioReceived) => {
                Some(NO_AUDIO.to_string())
            }
            RecognitionEvent::StreamEnd(ClosureClassification::TransportError {
                code,
                message,
            }) => to_json(&ErrorPayload {
                kind: "error",
                error_cause: ErrorCause::StreamClose,
                error_code: *code,
                error_message: message,
            }),
            RecognitionEvent::StreamEnd(ClosureClassification::Normal)
            | RecognitionEvent::SpeechActivityBegin
            | RecognitionEvent::SpeechActivityEnd => None,
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Option<String> {
    match serde_json::to_string(value) {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::error!("failed to serialize event payload: {e}");
            None
        }
    }
}
