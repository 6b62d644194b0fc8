use crate::error::ConfigError;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub session: SessionOptions,

    /// Per-call variables, keyed by their channel variable names.
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Size in bytes of one buffered audio chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Number of chunks held while the stream is connecting.
    #[serde(default = "default_buffer_chunks")]
    pub buffer_chunks: usize,

    /// Frames queued for the transport once connected; newer frames are
    /// dropped while the queue is full.
    #[serde(default = "default_outbound_frames")]
    pub outbound_frames: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            chunk_size: default_chunk_size(),
            buffer_chunks: default_buffer_chunks(),
            outbound_frames: default_outbound_frames(),
        }
    }
}

/// Arguments supplied when recognition is started on a call leg.
#[derive(Debug, Deserialize, Clone)]
pub struct SessionOptions {
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_channels")]
    pub channels: u32,

    #[serde(default)]
    pub interim: bool,

    #[serde(default)]
    pub single_utterance: bool,

    #[serde(default)]
    pub separate_recognition: bool,

    #[serde(default)]
    pub max_alternatives: u32,

    #[serde(default)]
    pub profanity_filter: bool,

    #[serde(default)]
    pub word_time_offset: bool,

    #[serde(default)]
    pub punctuation: bool,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub hints: Option<String>,

    /// Emit `play_interrupt` ahead of every inbound message.
    #[serde(default)]
    pub play_interrupt: bool,

    #[serde(default = "default_stream_tag")]
    pub stream_tag: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            language: default_language(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            interim: false,
            single_utterance: false,
            separate_recognition: false,
            max_alternatives: 0,
            profanity_filter: false,
            word_time_offset: false,
            punctuation: false,
            model: None,
            hints: None,
            play_interrupt: false,
            stream_tag: default_stream_tag(),
        }
    }
}

/// Read-only access to the variables attached to a call leg.
pub trait ChannelVariables {
    fn get_var(&self, name: &str) -> Option<&str>;
}

impl ChannelVariables for HashMap<String, String> {
    fn get_var(&self, name: &str) -> Option<&str> {
        self.get(name).map(|s| s.as_str())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_chunk_size() -> usize {
    320
}

fn default_buffer_chunks() -> usize {
    15
}

fn default_outbound_frames() -> usize {
    250
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_sample_rate() -> u32 {
    8000
}

fn default_channels() -> u32 {
    1
}

fn default_stream_tag() -> String {
    "transcribe".to_string()
}

/// Interpolate `${VAR}` patterns with environment variable values.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = Regex::new(r"\$\{([^}]+)\}").unwrap();
    let mut result = input.to_string();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        let val = std::env::var(var_name)
            .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
        result = result.replace(&cap[0], &val);
    }

    Ok(result)
}

impl AppConfig {
    /// Load configuration from a TOML file, with environment variable interpolation.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let interpolated = interpolate_env_vars(s)?;
        let config: AppConfig = toml::from_str(&interpolated)?;
        Ok(config)
    }
}
