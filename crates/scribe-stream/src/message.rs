//! Protocol-neutral request and response messages.

use crate::transport::{InboundMessage, OutboundMessage};
use scribe_core::{Offset, SessionConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamingRequest {
    Setup(Box<SessionConfig>),
    Audio(Vec<u8>),
}

impl OutboundMessage for StreamingRequest {
    fn setup(config: &SessionConfig) -> Self {
        StreamingRequest::Setup(Box::new(config.clone()))
    }

    fn audio(data: Vec<u8>) -> Self {
        StreamingRequest::Audio(data)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechEventType {
    #[default]
    Unspecified,
    EndOfSingleUtterance,
    SpeechActivityBegin,
    SpeechActivityEnd,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StreamingWord {
    #[serde(default)]
    pub word: String,
    #[serde(default)]
    pub start_offset: Option<Offset>,
    #[serde(default)]
    pub end_offset: Option<Offset>,
    /// Empty when the service did not label the speaker.
    #[serde(default)]
    pub speaker_label: String,
    /// Zero when the service did not report a confidence.
    #[serde(default)]
    pub confidence: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StreamingAlternative {
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default)]
    pub words: Vec<StreamingWord>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StreamingResult {
    #[serde(default)]
    pub alternatives: Vec<StreamingAlternative>,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub stability: f32,
    #[serde(default)]
    pub result_end_offset: Offset,
    #[serde(default)]
    pub channel_tag: i32,
    #[serde(default)]
    pub language_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StreamingResponse {
    #[serde(default)]
    pub results: Vec<StreamingResult>,
    #[serde(default)]
    pub speech_event_type: SpeechEventType,
}

impl InboundMessage for StreamingResponse {
    fn into_response(self) -> StreamingResponse {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_deserializes_with_defaults() {
        let response: StreamingResponse = serde_json::from_str(
            r#"{"results": [{"alternatives": [{"transcript": "hi"}], "is_final": true}]}"#,
        )
        .unwrap();
        assert_eq!(response.speech_event_type, SpeechEventType::Unspecified);
        let result = &response.results[0];
        assert!(result.is_final);
        assert_eq!(result.result_end_offset, Offset::default());
        assert_eq!(result.alternatives[0].transcript, "hi");
        assert_eq!(result.alternatives[0].confidence, 0.0);
    }

    #[test]
    fn test_speech_event_deserializes() {
        let response: StreamingResponse =
            serde_json::from_str(r#"{"speech_event_type": "end_of_single_utterance"}"#).unwrap();
        assert!(response.results.is_empty());
        assert_eq!(response.speech_event_type, SpeechEventType::EndOfSingleUtterance);
    }

    #[test]
    fn test_audio_request_carries_payload_only() {
        match StreamingRequest::audio(vec![1, 2, 3]) {
            StreamingRequest::Audio(data) => assert_eq!(data, vec![1, 2, 3]),
            other => panic!("expected audio, got {other:?}"),
        }
    }
}
