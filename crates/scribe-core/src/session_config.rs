//! Immutable recognition parameters for one streaming session.

use crate::config::{ChannelVariables, SessionOptions};
use crate::error::ConfigError;
use crate::hints::{parse_phrase_hints, PhraseHint};
use serde::Serialize;
use std::time::Duration;

pub const VAR_RECOGNIZER_PARENT: &str = "GOOGLE_SPEECH_RECOGNIZER_PARENT";
pub const VAR_RECOGNIZER_ID: &str = "GOOGLE_SPEECH_RECOGNIZER_ID";
pub const VAR_ALTERNATIVE_LANGUAGES: &str = "GOOGLE_SPEECH_ALTERNATIVE_LANGUAGE_CODES";
pub const VAR_DIARIZATION: &str = "GOOGLE_SPEECH_SPEAKER_DIARIZATION";
pub const VAR_DIARIZATION_MIN: &str = "GOOGLE_SPEECH_SPEAKER_DIARIZATION_MIN_SPEAKER_COUNT";
pub const VAR_DIARIZATION_MAX: &str = "GOOGLE_SPEECH_SPEAKER_DIARIZATION_MAX_SPEAKER_COUNT";
pub const VAR_NORMALIZATION: &str = "GOOGLE_SPEECH_TRANSCRIPTION_NORMALIZATION";
pub const VAR_START_TIMEOUT_MS: &str = "GOOGLE_SPEECH_START_TIMEOUT_MS";
pub const VAR_END_TIMEOUT_MS: &str = "GOOGLE_SPEECH_END_TIMEOUT_MS";
pub const VAR_VOICE_ACTIVITY_EVENTS: &str = "GOOGLE_SPEECH_ENABLE_VOICE_ACTIVITY_EVENTS";
pub const VAR_HINTS_BOOST: &str = "GOOGLE_SPEECH_HINTS_BOOST";

const MAX_ALTERNATIVE_LANGUAGES: usize = 3;
const WILDCARD_RECOGNIZER: &str = "_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AudioEncoding {
    Linear16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiarizationBounds {
    pub min_speaker_count: Option<u32>,
    pub max_speaker_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizationEntry {
    pub search: String,
    pub replace: String,
    pub case_sensitive: bool,
}

/// Explicit recognition parameters, only used with the wildcard recognizer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognitionConfig {
    pub language_codes: Vec<String>,
    pub encoding: AudioEncoding,
    pub sample_rate_hertz: u32,
    pub audio_channel_count: u32,
    pub separate_recognition_per_channel: Option<bool>,
    pub max_alternatives: Option<u32>,
    pub profanity_filter: Option<bool>,
    pub enable_word_time_offsets: Option<bool>,
    pub enable_automatic_punctuation: bool,
    pub model: Option<String>,
    pub phrase_hints: Vec<PhraseHint>,
    pub diarization: Option<DiarizationBounds>,
    pub transcript_normalization: Vec<NormalizationEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StreamingFeatures {
    pub speech_start_timeout: Option<Duration>,
    pub speech_end_timeout: Option<Duration>,
    pub enable_voice_activity_events: Option<bool>,
    pub interim_results: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionConfig {
    /// Full recognizer resource name.
    pub recognizer: String,
    pub recognition: Option<RecognitionConfig>,
    pub streaming: StreamingFeatures,
    /// Client-side: stop sending audio after the first end-of-utterance.
    pub single_utterance: bool,
}

impl SessionConfig {
    /// Snapshot the start arguments and call variables into a session config.
    ///
    /// Fails only when the recognizer parent is missing. Malformed optional
    /// values are logged and left at the service default.
    pub fn build(
        options: &SessionOptions,
        vars: &impl ChannelVariables,
    ) -> Result<Self, ConfigError> {
        let parent = vars
            .get_var(VAR_RECOGNIZER_PARENT)
            .ok_or(ConfigError::MissingVariable(VAR_RECOGNIZER_PARENT))?;

        let (recognizer, recognition) = match vars.get_var(VAR_RECOGNIZER_ID) {
            Some(id) => (format!("{parent}/recognizers/{id}"), None),
            None => (
                format!("{parent}/recognizers/{WILDCARD_RECOGNIZER}"),
                Some(build_recognition(options, vars)),
            ),
        };
        tracing::debug!(recognizer = %recognizer, "using recognizer");

        Ok(Self {
            recognizer,
            recognition,
            streaming: build_streaming(options, vars),
            single_utterance: options.single_utterance,
        })
    }
}

fn build_recognition(options: &SessionOptions, vars: &impl ChannelVariables) -> RecognitionConfig {
    let mut language_codes = vec![options.language.clone()];
    if let Some(alternatives) = vars.get_var(VAR_ALTERNATIVE_LANGUAGES) {
        language_codes.extend(
            alternatives
                .split(',')
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .take(MAX_ALTERNATIVE_LANGUAGES)
                .map(str::to_string),
        );
    }
    tracing::debug!(languages = ?language_codes, "transcribe languages");

    let separate_recognition_per_channel =
        (options.channels > 1 && options.separate_recognition).then_some(true);

    let phrase_hints = match options.hints.as_deref() {
        Some(hints) => {
            let boost = vars
                .get_var(VAR_HINTS_BOOST)
                .and_then(|b| parse_number::<f32>(VAR_HINTS_BOOST, b));
            parse_phrase_hints(hints, boost)
        }
        None => Vec::new(),
    };

    let diarization = vars.get_var(VAR_DIARIZATION).map(|_| DiarizationBounds {
        min_speaker_count: vars
            .get_var(VAR_DIARIZATION_MIN)
            .map(|v| speaker_count(v, 1)),
        max_speaker_count: vars
            .get_var(VAR_DIARIZATION_MAX)
            .map(|v| speaker_count(v, 2)),
    });

    let transcript_normalization = vars
        .get_var(VAR_NORMALIZATION)
        .map(parse_normalization)
        .unwrap_or_default();

    RecognitionConfig {
        language_codes,
        encoding: AudioEncoding::Linear16,
        sample_rate_hertz: options.sample_rate,
        audio_channel_count: options.channels,
        separate_recognition_per_channel,
        max_alternatives: (options.max_alternatives > 1).then_some(options.max_alternatives),
        profanity_filter: options.profanity_filter.then_some(true),
        enable_word_time_offsets: options.word_time_offset.then_some(true),
        enable_automatic_punctuation: options.punctuation,
        model: options.model.clone(),
        phrase_hints,
        diarization,
        transcript_normalization,
    }
}

fn build_streaming(options: &SessionOptions, vars: &impl ChannelVariables) -> StreamingFeatures {
    StreamingFeatures {
        speech_start_timeout: timeout_var(vars, VAR_START_TIMEOUT_MS),
        speech_end_timeout: timeout_var(vars, VAR_END_TIMEOUT_MS),
        enable_voice_activity_events: vars
            .get_var(VAR_VOICE_ACTIVITY_EVENTS)
            .map(|v| v == "true"),
        interim_results: options.interim.then_some(true),
    }
}

fn timeout_var(vars: &impl ChannelVariables, name: &str) -> Option<Duration> {
    let ms = parse_number::<u64>(name, vars.get_var(name)?)?;
    tracing::debug!("setting {name} to {ms} milliseconds");
    Some(Duration::from_millis(ms))
}

/// Leading integer of `value`, or 0 when there is none, raised to `floor`.
fn speaker_count(value: &str, floor: i64) -> u32 {
    let trimmed = value.trim_start();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let n = digits[..end].parse::<i64>().map_or(0, |n| sign * n);
    n.clamp(floor, i64::from(u32::MAX)) as u32
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Option<T> {
    match value.trim().parse::<T>() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!("ignoring {name}: {value:?} is not a valid number");
            None
        }
    }
}

/// Parse the normalization rule list, skipping entries that lack a field.
pub fn parse_normalization(raw: &str) -> Vec<NormalizationEntry> {
    let items = match serde_json::from_str::<Vec<serde_json::Value>>(raw) {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!("ignoring {VAR_NORMALIZATION}: {e}");
            return Vec::new();
        }
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let search = item.get("search").and_then(|v| v.as_str());
            let replace = item.get("replace").and_then(|v| v.as_str());
            let case_sensitive = item.get("case_sensitive").and_then(|v| {
                v.as_bool().or_else(|| v.as_i64().map(|n| n != 0))
            });
            match (search, replace, case_sensitive) {
                (Some(search), Some(replace), Some(case_sensitive)) => {
                    tracing::debug!(search, replace, case_sensitive, "transcript normalization");
                    Some(NormalizationEntry {
                        search: search.to_string(),
                        replace: replace.to_string(),
                        case_sensitive,
                    })
                }
                _ => {
                    tracing::warn!("skipping malformed normalization entry #{i}: {item}");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn parent() -> (&'static str, &'static str) {
        (VAR_RECOGNIZER_PARENT, "projects/p/locations/global")
    }

    #[test]
    fn test_missing_parent_is_error() {
        let result = SessionConfig::build(&SessionOptions::default(), &vars(&[]));
        match result {
            Err(ConfigError::MissingVariable(name)) => assert_eq!(name, VAR_RECOGNIZER_PARENT),
            other => panic!("expected MissingVariable, got {other:?}"),
        }
    }

    #[test]
    fn test_wildcard_recognizer_builds_explicit_config() {
        let config = SessionConfig::build(&SessionOptions::default(), &vars(&[parent()])).unwrap();
        assert_eq!(config.recognizer, "projects/p/locations/global/recognizers/_");
        let recognition = config.recognition.unwrap();
        assert_eq!(recognition.language_codes, vec!["en-US"]);
        assert_eq!(recognition.sample_rate_hertz, 8000);
        assert_eq!(recognition.audio_channel_count, 1);
        assert_eq!(recognition.encoding, AudioEncoding::Linear16);
    }

    #[test]
    fn test_named_recognizer_skips_explicit_config() {
        let config = SessionConfig::build(
            &SessionOptions::default(),
            &vars(&[parent(), (VAR_RECOGNIZER_ID, "my-rec")]),
        )
        .unwrap();
        assert_eq!(config.recognizer, "projects/p/locations/global/recognizers/my-rec");
        assert!(config.recognition.is_none());
    }

    #[test]
    fn test_zero_values_map_to_service_default() {
        let config = SessionConfig::build(&SessionOptions::default(), &vars(&[parent()])).unwrap();
        let recognition = config.recognition.unwrap();
        assert!(recognition.max_alternatives.is_none());
        assert!(recognition.profanity_filter.is_none());
        assert!(recognition.enable_word_time_offsets.is_none());
        assert!(recognition.separate_recognition_per_channel.is_none());
        assert!(recognition.model.is_none());
        assert!(recognition.diarization.is_none());
        assert!(!recognition.enable_automatic_punctuation);
        assert_eq!(config.streaming, StreamingFeatures::default());
    }

    #[test]
    fn test_explicit_options_are_applied() {
        let options = SessionOptions {
            channels: 2,
            separate_recognition: true,
            max_alternatives: 3,
            profanity_filter: true,
            word_time_offset: true,
            punctuation: true,
            interim: true,
            model: Some("telephony".to_string()),
            hints: Some("alpha,beta".to_string()),
            ..SessionOptions::default()
        };
        let config = SessionConfig::build(&options, &vars(&[parent()])).unwrap();
        let recognition = config.recognition.unwrap();
        assert_eq!(recognition.separate_recognition_per_channel, Some(true));
        assert_eq!(recognition.max_alternatives, Some(3));
        assert_eq!(recognition.profanity_filter, Some(true));
        assert_eq!(recognition.enable_word_time_offsets, Some(true));
        assert!(recognition.enable_automatic_punctuation);
        assert_eq!(recognition.model.as_deref(), Some("telephony"));
        assert_eq!(recognition.phrase_hints.len(), 2);
        assert_eq!(config.streaming.interim_results, Some(true));
    }

    #[test]
    fn test_single_max_alternative_is_default() {
        let options = SessionOptions {
            max_alternatives: 1,
            ..SessionOptions::default()
        };
        let config = SessionConfig::build(&options, &vars(&[parent()])).unwrap();
        assert!(config.recognition.unwrap().max_alternatives.is_none());
    }

    #[test]
    fn test_separate_recognition_needs_multiple_channels() {
        let options = SessionOptions {
            channels: 1,
            separate_recognition: true,
            ..SessionOptions::default()
        };
        let config = SessionConfig::build(&options, &vars(&[parent()])).unwrap();
        assert!(config.recognition.unwrap().separate_recognition_per_channel.is_none());
    }

    #[test]
    fn test_alternative_languages_capped() {
        let config = SessionConfig::build(
            &SessionOptions::default(),
            &vars(&[parent(), (VAR_ALTERNATIVE_LANGUAGES, "fr-FR,de-DE,es-ES,it-IT")]),
        )
        .unwrap();
        assert_eq!(
            config.recognition.unwrap().language_codes,
            vec!["en-US", "fr-FR", "de-DE", "es-ES"]
        );
    }

    #[test]
    fn test_diarization_bounds_clamped() {
        let config = SessionConfig::build(
            &SessionOptions::default(),
            &vars(&[
                parent(),
                (VAR_DIARIZATION, "true"),
                (VAR_DIARIZATION_MIN, "0"),
                (VAR_DIARIZATION_MAX, "1"),
            ]),
        )
        .unwrap();
        let bounds = config.recognition.unwrap().diarization.unwrap();
        assert_eq!(bounds.min_speaker_count, Some(1));
        assert_eq!(bounds.max_speaker_count, Some(2));
    }

    #[test]
    fn test_diarization_counts_use_leading_integer() {
        let config = SessionConfig::build(
            &SessionOptions::default(),
            &vars(&[
                parent(),
                (VAR_DIARIZATION, "true"),
                (VAR_DIARIZATION_MIN, "many"),
                (VAR_DIARIZATION_MAX, "6 speakers"),
            ]),
        )
        .unwrap();
        let bounds = config.recognition.unwrap().diarization.unwrap();
        assert_eq!(bounds.min_speaker_count, Some(1));
        assert_eq!(bounds.max_speaker_count, Some(6));
    }

    #[test]
    fn test_diarization_garbage_max_becomes_two() {
        let config = SessionConfig::build(
            &SessionOptions::default(),
            &vars(&[parent(), (VAR_DIARIZATION, "1"), (VAR_DIARIZATION_MAX, "-")]),
        )
        .unwrap();
        let bounds = config.recognition.unwrap().diarization.unwrap();
        assert_eq!(bounds.min_speaker_count, None);
        assert_eq!(bounds.max_speaker_count, Some(2));
    }

    #[test]
    fn test_diarization_counts_ignored_without_enable() {
        let config = SessionConfig::build(
            &SessionOptions::default(),
            &vars(&[parent(), (VAR_DIARIZATION_MIN, "3")]),
        )
        .unwrap();
        assert!(config.recognition.unwrap().diarization.is_none());
    }

    #[test]
    fn test_timeouts_converted_to_durations() {
        let config = SessionConfig::build(
            &SessionOptions::default(),
            &vars(&[
                parent(),
                (VAR_START_TIMEOUT_MS, "3500"),
                (VAR_END_TIMEOUT_MS, "800"),
            ]),
        )
        .unwrap();
        assert_eq!(config.streaming.speech_start_timeout, Some(Duration::from_millis(3500)));
        assert_eq!(config.streaming.speech_end_timeout, Some(Duration::from_millis(800)));
        assert_eq!(
            config.streaming.speech_end_timeout.unwrap().as_nanos(),
            800_000_000
        );
    }

    #[test]
    fn test_unparseable_timeout_left_unset() {
        let config = SessionConfig::build(
            &SessionOptions::default(),
            &vars(&[parent(), (VAR_START_TIMEOUT_MS, "soon")]),
        )
        .unwrap();
        assert!(config.streaming.speech_start_timeout.is_none());
    }

    #[test]
    fn test_voice_activity_events_flag() {
        let on = SessionConfig::build(
            &SessionOptions::default(),
            &vars(&[parent(), (VAR_VOICE_ACTIVITY_EVENTS, "true")]),
        )
        .unwrap();
        assert_eq!(on.streaming.enable_voice_activity_events, Some(true));

        let off = SessionConfig::build(
            &SessionOptions::default(),
            &vars(&[parent(), (VAR_VOICE_ACTIVITY_EVENTS, "yes")]),
        )
        .unwrap();
        assert_eq!(off.streaming.enable_voice_activity_events, Some(false));
    }

    #[test]
    fn test_streaming_features_apply_with_named_recognizer() {
        let options = SessionOptions {
            interim: true,
            ..SessionOptions::default()
        };
        let config = SessionConfig::build(
            &options,
            &vars(&[parent(), (VAR_RECOGNIZER_ID, "r"), (VAR_END_TIMEOUT_MS, "100")]),
        )
        .unwrap();
        assert_eq!(config.streaming.interim_results, Some(true));
        assert_eq!(config.streaming.speech_end_timeout, Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_malformed_normalization_entry_is_skipped() {
        let raw = r#"[
            {"search": "gonna", "replace": "going to", "case_sensitive": false},
            {"search": "wanna", "case_sensitive": true},
            {"search": "Acme", "replace": "ACME", "case_sensitive": 1}
        ]"#;
        let config = SessionConfig::build(
            &SessionOptions::default(),
            &vars(&[parent(), (VAR_NORMALIZATION, raw)]),
        )
        .unwrap();
        let entries = config.recognition.unwrap().transcript_normalization;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].search, "gonna");
        assert_eq!(entries[0].replace, "going to");
        assert!(!entries[0].case_sensitive);
        assert_eq!(entries[1].search, "Acme");
        assert!(entries[1].case_sensitive);
    }

    #[test]
    fn test_unparseable_normalization_is_ignored() {
        assert!(parse_normalization("{not json").is_empty());
        assert!(parse_normalization(r#"{"search": "a"}"#).is_empty());
    }

    #[test]
    fn test_hints_boost_variable_applies() {
        let options = SessionOptions {
            hints: Some(r#"["refund"]"#.to_string()),
            ..SessionOptions::default()
        };
        let config = SessionConfig::build(
            &options,
            &vars(&[parent(), (VAR_HINTS_BOOST, "12.5")]),
        )
        .unwrap();
        let hints = config.recognition.unwrap().phrase_hints;
        assert_eq!(hints[0].phrase, "refund");
        assert_eq!(hints[0].boost, Some(12.5));
    }
}
