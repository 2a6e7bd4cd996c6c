use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_ORIGIN: &str = "http://127.0.0.1:8000";
/// Well-known path of the story channel on the hosting origin.
pub const STORY_PATH: &str = "/ws";
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_REVEAL_SPEED: Duration = Duration::from_millis(50);
pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Origin of the hosting page, e.g. `http://127.0.0.1:8000`.
    pub origin: String,
    pub reconnect_delay: Duration,
    /// Pause after each revealed character.
    pub reveal_speed: Duration,
    pub notice_ttl: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.into(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            reveal_speed: DEFAULT_REVEAL_SPEED,
            notice_ttl: DEFAULT_NOTICE_TTL,
        }
    }
}

impl ClientConfig {
    pub fn endpoint(&self) -> Result<Url, ConfigError> {
        endpoint_from_origin(&self.origin)
    }
}

/// Maps `http[s]://host[:port]` to `ws[s]://host[:port]/ws`.
pub fn endpoint_from_origin(origin: &str) -> Result<Url, ConfigError> {
    let origin = origin.trim();
    let mut url = Url::parse(origin).map_err(|source| ConfigError::InvalidOrigin {
        origin: origin.to_string(),
        source,
    })?;

    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
    };
    if url.host_str().is_none() {
        return Err(ConfigError::MissingHost(origin.to_string()));
    }
    url.set_scheme(scheme)
        .map_err(|()| ConfigError::UnsupportedScheme(url.scheme().to_string()))?;
    url.set_path(STORY_PATH);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
