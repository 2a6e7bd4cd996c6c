use super::*;

use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn defaults_match_client_defaults() {
    assert_eq!(Settings::default().client_config(), ClientConfig::default());
}

#[test]
fn file_values_override_defaults() {
    let mut settings = Settings::default();
    apply_file(
        &mut settings,
        "origin = \"https://stories.example\"\nreveal_speed_ms = 10\n",
    )
    .expect("parse");

    assert_eq!(settings.origin, "https://stories.example");
    assert_eq!(settings.reveal_speed_ms, 10);
    assert_eq!(settings.reconnect_delay_secs, Settings::default().reconnect_delay_secs);
}

#[test]
fn malformed_file_is_an_error() {
    let mut settings = Settings::default();
    assert!(apply_file(&mut settings, "reveal_speed_ms = \"fast\"").is_err());
}

#[test]
fn app_prefixed_env_wins_over_story_prefix() {
    let env = vars(&[
        ("STORY_ORIGIN", "http://story.local"),
        ("APP__ORIGIN", "http://app.local"),
        ("STORY_RECONNECT_DELAY_SECS", "9"),
        ("STORY_REVEAL_SPEED_MS", "not-a-number"),
    ]);
    let mut settings = Settings::default();
    apply_env(&mut settings, |key| env.get(key).cloned());

    assert_eq!(settings.origin, "http://app.local");
    assert_eq!(settings.reconnect_delay_secs, 9);
    assert_eq!(settings.reveal_speed_ms, Settings::default().reveal_speed_ms);
}

#[test]
fn explicit_config_path_must_exist() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let missing = env::temp_dir().join(format!("storyteller_missing_{suffix}.toml"));

    assert!(load_settings(Some(&missing)).is_err());
}

#[test]
fn explicit_config_path_is_loaded() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("storyteller_config_{suffix}.toml"));
    fs::write(&path, "notice_ttl_secs = 2\n").expect("write config");

    let settings = load_settings(Some(&path)).expect("load");
    assert_eq!(settings.notice_ttl_secs, 2);
    assert_eq!(settings.client_config().notice_ttl, Duration::from_secs(2));

    fs::remove_file(path).expect("cleanup");
}
