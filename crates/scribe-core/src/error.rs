use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("required channel variable not set: {0}")]
    MissingVariable(&'static str),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to connect ({code}): {message}")]
    Connect { code: i32, message: String },

    #[error("session already connected")]
    AlreadyConnected,

    #[error("session is finished")]
    Finished,
}
