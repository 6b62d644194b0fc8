use crate::types::{
    ClosureClassification, ErrorCause, RecognitionEvent, StreamFailure, TransportStatus,
};

/// Transport code the service uses both for its session duration limit and
/// for streams that never received audio.
pub const DURATION_LIMIT_CODE: i32 = 10;

/// Message fragment that separates the duration limit from "no audio".
pub const MAX_DURATION_PHRASE: &str = "Max duration of 5 minutes reached";

/// Classify the terminal status returned by `finish()`.
///
/// Only the duration-limit code is disambiguated by message text.
pub fn classify(status: &TransportStatus) -> ClosureClassification {
    match status.code {
        TransportStatus::OK => ClosureClassification::Normal,
        DURATION_LIMIT_CODE if status.message.contains(MAX_DURATION_PHRASE) => {
            ClosureClassification::MaxDurationExceeded
        }
        DURATION_LIMIT_CODE => ClosureClassification::NoAudioReceived,
        code => ClosureClassification::TransportError {
            code,
            message: status.message.clone(),
        },
    }
}

impl ClosureClassification {
    /// The event reported to the host for this closure.
    pub fn into_event(self) -> RecognitionEvent {
        match self {
            ClosureClassification::TransportError { code, message } => {
                RecognitionEvent::StreamError(StreamFailure {
                    cause: ErrorCause::StreamClose,
                    status: TransportStatus::new(code, message),
                })
            }
            other => RecognitionEvent::StreamEnd(other),
        }
    }
}
