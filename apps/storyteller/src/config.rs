use std::{fs, io, path::Path, time::Duration};

use anyhow::Context;
use client_core::{config::DEFAULT_ORIGIN, ClientConfig};
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "storyteller.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub origin: String,
    pub reconnect_delay_secs: u64,
    pub reveal_speed_ms: u64,
    pub notice_ttl_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let client = ClientConfig::default();
        Self {
            origin: DEFAULT_ORIGIN.into(),
            reconnect_delay_secs: client.reconnect_delay.as_secs(),
            reveal_speed_ms: client.reveal_speed.as_millis() as u64,
            notice_ttl_secs: client.notice_ttl.as_secs(),
        }
    }
}

impl Settings {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            origin: self.origin.clone(),
            reconnect_delay: Duration::from_secs(self.reconnect_delay_secs),
            reveal_speed: Duration::from_millis(self.reveal_speed_ms),
            notice_ttl: Duration::from_secs(self.notice_ttl_secs),
        }
    }
}

/// Keys accepted in `storyteller.toml`. Anything absent keeps its default.
#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    origin: Option<String>,
    reconnect_delay_secs: Option<u64>,
    reveal_speed_ms: Option<u64>,
    notice_ttl_secs: Option<u64>,
}

/// Defaults, then the config file, then `STORY_*` / `APP__*` environment
/// variables. A missing file is not an error when `path` is the default.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let (path, required) = match path {
        Some(path) => (path, true),
        None => (Path::new(DEFAULT_CONFIG_PATH), false),
    };
    match fs::read_to_string(path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?,
        Err(err) if err.kind() == io::ErrorKind::NotFound && !required => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", path.display()))
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

pub(crate) fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.origin {
        settings.origin = v;
    }
    if let Some(v) = file_cfg.reconnect_delay_secs {
        settings.reconnect_delay_secs = v;
    }
    if let Some(v) = file_cfg.reveal_speed_ms {
        settings.reveal_speed_ms = v;
    }
    if let Some(v) = file_cfg.notice_ttl_secs {
        settings.notice_ttl_secs = v;
    }
    Ok(())
}

/// `APP__*` wins over `STORY_*`. Unparsable numbers are ignored.
pub(crate) fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    let lookup = |short: &str, long: &str| var(long).or_else(|| var(short));

    if let Some(v) = lookup("STORY_ORIGIN", "APP__ORIGIN") {
        settings.origin = v;
    }
    if let Some(v) = lookup("STORY_RECONNECT_DELAY_SECS", "APP__RECONNECT_DELAY_SECS")
        .and_then(|v| v.parse().ok())
    {
        settings.reconnect_delay_secs = v;
    }
    if let Some(v) = lookup("STORY_REVEAL_SPEED_MS", "APP__REVEAL_SPEED_MS")
        .and_then(|v| v.parse().ok())
    {
        settings.reveal_speed_ms = v;
    }
    if let Some(v) = lookup("STORY_NOTICE_TTL_SECS", "APP__NOTICE_TTL_SECS")
        .and_then(|v| v.parse().ok())
    {
        settings.notice_ttl_secs = v;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
