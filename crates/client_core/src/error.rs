use thiserror::Error;

use crate::channel::ChannelState;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid origin `{origin}`: {source}")]
    InvalidOrigin {
        origin: String,
        #[source]
        source: url::ParseError,
    },
    #[error("origin scheme must be http or https, got `{0}`")]
    UnsupportedScheme(String),
    #[error("origin `{0}` has no host")]
    MissingHost(String),
}

/// Why an outbound action was not handed to the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("channel is {0}, not open")]
    NotOpen(ChannelState),
    #[error("channel manager has shut down")]
    Shutdown,
}
