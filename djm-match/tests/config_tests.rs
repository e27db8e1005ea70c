//! Settings file resolution and layering

use djm_common::config::{resolve_settings_path, CONFIG_ENV_VAR};
use djm_match::{ConfigValidationError, MatchConfig, MatcherSettings};
use serial_test::serial;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_settings(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
#[serial]
fn settings_file_named_by_environment_is_loaded() {
    let dir = TempDir::new().unwrap();
    let path = write_settings(
        &dir,
        r#"
preset = "fast"

[matching]
min_accept_score = 75.0

[research]
title_sim_floor = 40.0

[runner]
track_workers = 2

[logging]
level = "debug"
"#,
    );

    std::env::set_var(CONFIG_ENV_VAR, &path);
    let resolved = resolve_settings_path(None, CONFIG_ENV_VAR);
    std::env::remove_var(CONFIG_ENV_VAR);

    let resolved = resolved.unwrap();
    assert_eq!(resolved, path);

    let settings = MatcherSettings::load(&resolved).unwrap();
    assert_eq!(settings.runner.track_workers, 2);
    assert_eq!(settings.logging.level, "debug");

    let initial = settings.initial_config(None).unwrap();
    let fast = MatchConfig::preset("fast").unwrap();
    assert_eq!(initial.min_accept_score, 75.0);
    assert_eq!(initial.max_candidates_per_query, fast.max_candidates_per_query);
    assert!(initial.validate().is_ok());

    let research = settings.research_config().unwrap();
    assert_eq!(research.title_sim_floor, 40.0);
    assert_eq!(research.min_accept_score, MatchConfig::preset("relaxed").unwrap().min_accept_score);
}

#[test]
#[serial]
fn command_line_path_beats_environment() {
    let dir = TempDir::new().unwrap();
    let path = write_settings(&dir, "preset = \"thorough\"\n");

    std::env::set_var(CONFIG_ENV_VAR, "/nowhere/config.toml");
    let resolved = resolve_settings_path(Some(&path), CONFIG_ENV_VAR);
    std::env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(resolved, Some(path));
}

#[test]
fn preset_override_wins_over_file_preset() {
    let dir = TempDir::new().unwrap();
    let path = write_settings(&dir, "preset = \"fast\"\n");
    let settings = MatcherSettings::load(&path).unwrap();

    let config = settings.initial_config(Some("thorough")).unwrap();

    assert_eq!(config, MatchConfig::preset("thorough").unwrap());
}

#[test]
fn empty_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_settings(&dir, "");
    let settings = MatcherSettings::load(&path).unwrap();

    assert_eq!(settings, MatcherSettings::default());
    assert_eq!(settings.initial_config(None).unwrap(), MatchConfig::default());
    assert_eq!(settings.logging.level, "info");
}

#[test]
fn unknown_override_field_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_settings(&dir, "[matching]\nmin_acept_score = 80.0\n");

    assert!(MatcherSettings::load(&path).is_err());
}

#[test]
fn missing_settings_file_is_not_found() {
    let dir = TempDir::new().unwrap();
    let err = MatcherSettings::load(&dir.path().join("absent.toml")).unwrap_err();

    assert!(matches!(err, djm_common::Error::NotFound(_)));
}

#[test]
fn unknown_preset_is_reported() {
    let settings = MatcherSettings {
        preset: Some("turbo".to_string()),
        ..Default::default()
    };

    assert!(matches!(
        settings.initial_config(None),
        Err(ConfigValidationError::UnknownPreset(name)) if name == "turbo"
    ));
}

#[test]
fn contradictory_overrides_fail_validation() {
    let dir = TempDir::new().unwrap();
    let path = write_settings(
        &dir,
        "[matching]\nmin_accept_score = 95.0\nearly_exit_score = 80.0\nfetch_workers = 0\n",
    );
    let config = MatcherSettings::load(&path).unwrap().initial_config(None).unwrap();

    match config.validate() {
        Err(ConfigValidationError::Violations(v)) => {
            assert_eq!(v.len(), 2);
            assert!(v.iter().any(|m| m.contains("early_exit_score")));
            assert!(v.iter().any(|m| m.contains("fetch_workers")));
        }
        other => panic!("expected violations, got {other:?}"),
    }
}
