use std::{env, fs, time::Duration};

use dpmaker::compose::BackgroundOption;
use dpmaker::config::*;
use tempfile::tempdir;

mod common;
use common::lock_env;

#[test]
fn missing_file_means_defaults() {
    let tmp = tempdir().unwrap();
    let config = load_from_path(&tmp.path().join("nope.toml")).unwrap();
    assert_eq!(config, Config::default());
    assert!(config.restyle_endpoint.is_none());
    assert_eq!(config.restyle_timeout(), Duration::from_secs(120));
    assert_eq!(config.event.tag, "DevFestLagos");
}

#[test]
fn partial_file_keeps_other_defaults() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join(CONFIG_FILE);
    fs::write(
        &path,
        r#"
restyle_endpoint = "https://proxy.example.com/restyle"
default_background = "purple"

[event]
dp_suffix = true
logo_svg = '<circle id="event-mark" r="20"/>'
"#,
    )
    .unwrap();
    let config = load_from_path(&path).unwrap();
    assert_eq!(
        config.restyle_endpoint.as_deref(),
        Some("https://proxy.example.com/restyle")
    );
    assert_eq!(config.default_background, BackgroundOption::Purple);
    assert!(config.event.dp_suffix);
    assert_eq!(config.event.share_message, "I'll be at #DevFestLagos2025!");
    let frame = config.event.frame_assets();
    assert_eq!(frame.message.len(), 2);
    assert_eq!(frame.logo_svg.as_deref(), Some(r#"<circle id="event-mark" r="20"/>"#));
}

#[test]
fn invalid_file_is_an_error() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join(CONFIG_FILE);
    fs::write(&path, "restyle_timeout_secs = \"soon\"").unwrap();
    let err = load_from_path(&path).unwrap_err();
    assert!(format!("{err:#}").contains("Invalid config file"));
}

#[test]
fn config_dir_and_endpoint_come_from_the_environment() {
    let _guard = lock_env();
    let tmp = tempdir().unwrap();
    fs::write(
        tmp.path().join(CONFIG_FILE),
        "output_dir = \"/tmp/dps\"\nrestyle_endpoint = \"http://from-file\"\n",
    )
    .unwrap();
    env::set_var(CONFIG_DIR_ENV, tmp.path());
    env::set_var(ENDPOINT_ENV, "http://from-env");

    let config = load(None);

    env::remove_var(CONFIG_DIR_ENV);
    env::remove_var(ENDPOINT_ENV);

    let config = config.unwrap();
    assert_eq!(config.output_dir(), std::path::PathBuf::from("/tmp/dps"));
    assert_eq!(config.restyle_endpoint.as_deref(), Some("http://from-env"));
}

#[test]
fn blank_endpoint_in_environment_is_ignored() {
    let _guard = lock_env();
    let mut config = Config {
        restyle_endpoint: Some("http://from-file".into()),
        ..Config::default()
    };
    env::set_var(ENDPOINT_ENV, "   ");
    config.apply_env();
    env::remove_var(ENDPOINT_ENV);
    assert_eq!(config.restyle_endpoint.as_deref(), Some("http://from-file"));
}
