use crate::message::{SpeechEventType, StreamingAlternative, StreamingResponse, StreamingWord};
use scribe_core::{Alternative, RecognitionEvent, RecognitionResult, WordInfo};

/// Translate one inbound response into recognition events.
///
/// Results come first, in service order, followed by the speech event marker
/// carried by the same response, if any.
pub fn translate(response: &StreamingResponse) -> Vec<RecognitionEvent> {
    let mut events: Vec<RecognitionEvent> = response
        .results
        .iter()
        .map(|result| {
            let mut alternatives: Vec<Alternative> =
                result.alternatives.iter().map(translate_alternative).collect();
            if alternatives.is_empty() {
                alternatives.push(Alternative::empty());
            }
            RecognitionEvent::Result(RecognitionResult {
                stability: result.stability,
                is_final: result.is_final,
                alternatives,
                language_code: result.language_code.clone(),
                channel_tag: result.channel_tag,
                result_end_time: result.result_end_offset.as_millis(),
            })
        })
        .collect();

    match response.speech_event_type {
        SpeechEventType::EndOfSingleUtterance => events.push(RecognitionEvent::EndOfUtterance),
        SpeechEventType::SpeechActivityBegin => events.push(RecognitionEvent::SpeechActivityBegin),
        SpeechEventType::SpeechActivityEnd => events.push(RecognitionEvent::SpeechActivityEnd),
        SpeechEventType::Unspecified => {}
    }

    events
}

fn translate_alternative(alternative: &StreamingAlternative) -> Alternative {
    Alternative {
        confidence: alternative.confidence,
        transcript: alternative.transcript.clone(),
        words: alternative.words.iter().map(translate_word).collect(),
    }
}

fn translate_word(word: &StreamingWord) -> WordInfo {
    WordInfo {
        word: word.word.clone(),
        start_offset: word.start_offset.map(|o| o.seconds),
        end_offset: word.end_offset.map(|o| o.seconds),
        speaker_label: (!word.speaker_label.is_empty()).then(|| word.speaker_label.clone()),
        confidence: (word.confidence > 0.0).then_some(word.confidence),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::StreamingResult;
    use scribe_core::Offset;

    fn result_with(alternatives: Vec<StreamingAlternative>) -> StreamingResult {
        StreamingResult {
            alternatives,
            is_final: true,
            stability: 0.25,
            result_end_offset: Offset::new(2, 500_000_000),
            channel_tag: 1,
            language_code: "en-us".to_string(),
        }
    }

    fn single(response: &StreamingResponse) -> RecognitionResult {
        match translate(response).into_iter().next() {
            Some(RecognitionEvent::Result(r)) => r,
            other => panic!("expected a result, got {other:?}"),
        }
    }

    #[test]
    fn test_result_fields_copied() {
        let response = StreamingResponse {
            results: vec![result_with(vec![StreamingAlternative {
                transcript: "hello".to_string(),
                confidence: 0.9,
                words: Vec::new(),
            }])],
            ..Default::default()
        };
        let result = single(&response);
        assert_eq!(result.stability, 0.25);
        assert!(result.is_final);
        assert_eq!(result.language_code, "en-us");
        assert_eq!(result.channel_tag, 1);
        assert_eq!(result.result_end_time, 2500);
        assert_eq!(result.alternatives[0].transcript, "hello");
        assert_eq!(result.alternatives[0].confidence, 0.9);
    }

    #[test]
    fn test_result_end_time_truncates() {
        let mut raw = result_with(Vec::new());
        raw.result_end_offset = Offset::new(2, 999_999_999);
        let response = StreamingResponse {
            results: vec![raw],
            ..Default::default()
        };
        assert_eq!(single(&response).result_end_time, 2999);
    }

    #[test]
    fn test_zero_alternatives_normalized_to_one_empty() {
        let response = StreamingResponse {
            results: vec![result_with(Vec::new())],
            ..Default::default()
        };
        let result = single(&response);
        assert_eq!(result.alternatives.len(), 1);
        assert_eq!(result.alternatives[0], Alternative::empty());
    }

    #[test]
    fn test_alternatives_keep_service_order() {
        let alts = ["first", "second", "third"]
            .iter()
            .map(|t| StreamingAlternative {
                transcript: t.to_string(),
                ..Default::default()
            })
            .collect();
        let response = StreamingResponse {
            results: vec![result_with(alts)],
            ..Default::default()
        };
        let transcripts: Vec<_> = single(&response)
            .alternatives
            .into_iter()
            .map(|a| a.transcript)
            .collect();
        assert_eq!(transcripts, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_sparse_word_fields_omitted() {
        let response = StreamingResponse {
            results: vec![result_with(vec![StreamingAlternative {
                transcript: "a b".to_string(),
                confidence: 0.5,
                words: vec![
                    StreamingWord {
                        word: "a".to_string(),
                        start_offset: Some(Offset::new(1, 900_000_000)),
                        end_offset: Some(Offset::new(2, 100_000_000)),
                        speaker_label: "1".to_string(),
                        confidence: 0.8,
                    },
                    StreamingWord {
                        word: "b".to_string(),
                        ..Default::default()
                    },
                ],
            }])],
            ..Default::default()
        };
        let words = &single(&response).alternatives[0].words;
        assert_eq!(words[0].start_offset, Some(1));
        assert_eq!(words[0].end_offset, Some(2));
        assert_eq!(words[0].speaker_label.as_deref(), Some("1"));
        assert_eq!(words[0].confidence, Some(0.8));
        assert_eq!(words[1].word, "b");
        assert!(words[1].start_offset.is_none());
        assert!(words[1].speaker_label.is_none());
        assert!(words[1].confidence.is_none());
    }

    #[test]
    fn test_speech_event_follows_results() {
        let response = StreamingResponse {
            results: vec![result_with(Vec::new()), result_with(Vec::new())],
            speech_event_type: SpeechEventType::EndOfSingleUtterance,
        };
        let events = translate(&response);
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], RecognitionEvent::Result(_)));
        assert!(matches!(events[1], RecognitionEvent::Result(_)));
        assert_eq!(events[2], RecognitionEvent::EndOfUtterance);
    }

    #[test]
    fn test_activity_markers_without_results() {
        let begin = StreamingResponse {
            speech_event_type: SpeechEventType::SpeechActivityBegin,
            ..Default::default()
        };
        assert_eq!(translate(&begin), vec![RecognitionEvent::SpeechActivityBegin]);

        let end = StreamingResponse {
            speech_event_type: SpeechEventType::SpeechActivityEnd,
            ..Default::default()
        };
        assert_eq!(translate(&end), vec![RecognitionEvent::SpeechActivityEnd]);
    }

    #[test]
    fn test_empty_response_yields_nothing() {
        assert!(translate(&StreamingResponse::default()).is_empty());
    }
}
