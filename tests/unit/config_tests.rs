use std::path::PathBuf;
use std::time::Duration;

use agent_conductor::models::Transport;
use agent_conductor::stream::DEFAULT_MAX_FRAME_BYTES;
use agent_conductor::{AppError, Settings};

#[test]
fn empty_config_uses_defaults() {
    let settings = Settings::from_toml_str("").expect("empty config is valid");

    assert_eq!(settings, Settings::default());
    assert_eq!(
        settings.sessions_file,
        PathBuf::from(".agent-conductor").join("sessions.json")
    );
    assert!(settings.stream_json);
    assert!(!settings.dangerously_skip_permissions);
    assert_eq!(settings.qwen_transport, Transport::Cmdline);
    assert_eq!(settings.grace_period(), Duration::from_secs(3));
    assert_eq!(settings.long_prompt_bytes, 16 * 1024);
    assert_eq!(settings.max_frame_bytes, DEFAULT_MAX_FRAME_BYTES);
}

#[test]
fn full_config_parses() {
    let raw = r#"
logs_root = "/var/log/conductor"
sessions_file = "/var/lib/conductor/sessions.json"
temp_dir = "/tmp/conductor"
dangerously_skip_permissions = true
stream_json = false
qwen_transport = "stdio"
grace_period_seconds = 10
long_prompt_bytes = 4096
max_frame_bytes = 2097152
"#;
    let settings = Settings::from_toml_str(raw).expect("valid config");

    assert_eq!(settings.logs_root, PathBuf::from("/var/log/conductor"));
    assert_eq!(settings.temp_dir, PathBuf::from("/tmp/conductor"));
    assert!(settings.dangerously_skip_permissions);
    assert!(!settings.stream_json);
    assert_eq!(settings.qwen_transport, Transport::Stdio);
    assert_eq!(settings.build_context().transport, Transport::Stdio);
    assert_eq!(settings.grace_period(), Duration::from_secs(10));
    assert_eq!(settings.long_prompt_bytes, 4096);
    assert_eq!(settings.max_frame_bytes, 2 * 1024 * 1024);
}

#[test]
fn zero_grace_period_is_rejected() {
    let err = Settings::from_toml_str("grace_period_seconds = 0").unwrap_err();
    assert!(matches!(err, AppError::Config(_)), "got {err:?}");
}

#[test]
fn zero_long_prompt_bytes_is_rejected() {
    let err = Settings::from_toml_str("long_prompt_bytes = 0").unwrap_err();
    assert!(matches!(err, AppError::Config(_)), "got {err:?}");
}

#[test]
fn zero_max_frame_bytes_is_rejected() {
    let err = Settings::from_toml_str("max_frame_bytes = 0").unwrap_err();
    assert!(matches!(err, AppError::Config(_)), "got {err:?}");
}

#[test]
fn unknown_transport_is_a_config_error() {
    let err = Settings::from_toml_str("qwen_transport = \"carrier-pigeon\"").unwrap_err();
    assert!(matches!(err, AppError::Config(_)), "got {err:?}");
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::load_or_default(Some(&dir.path().join("absent.toml"))).unwrap();
    assert_eq!(settings, Settings::default());
}

#[test]
fn load_from_path_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "grace_period_seconds = 7\n").unwrap();

    let settings = Settings::load_from_path(&path).unwrap();
    assert_eq!(settings.grace_period(), Duration::from_secs(7));
}
