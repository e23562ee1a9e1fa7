use thiserror::Error;

#[derive(Error, Debug)]
pub enum VigilError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid wildcard pattern for template '{template}': {message}")]
    Pattern { template: String, message: String },

    #[error("Invalid retention period '{value}' for template '{template}'")]
    Period { template: String, value: String },

    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Async task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Channel send error")]
    ChannelSend,

    #[error("Network error: {0}")]
    Network(String),
}

/// Result type alias for vigil operations
pub type Result<T> = std::result::Result<T, VigilError>;

impl VigilError {
    /// Creates a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a new parse error
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Creates a new network error
    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::Network(msg.into())
    }

    /// Returns true if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Parse { .. } => true,
            Self::Network(_) => true,
            Self::ChannelSend => true,
            _ => false,
        }
    }

    /// Returns the error category for metrics/logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Pattern { .. } | Self::Period { .. } => "template",
            Self::Parse { .. } => "parse",
            Self::Io(_) => "io",
            Self::Join(_) => "async",
            Self::ChannelSend => "channel",
            Self::Network(_) => "network",
        }
    }
}
