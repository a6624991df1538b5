//! Integration tests for the configuration file loader: environment
//! variable resolution, path traversal rejection, and validation failures
//! surfacing through `load_settings`.

use kairos_gateway_core::config::{load_settings, LoadError};
use kairos_gateway_core::models::route::{MatchMode, Route};
use kairos_gateway_core::models::request::Method;
use kairos_gateway_core::models::upstream::{TargetConfig, UpstreamConfig};
use std::env;
use std::io::Write;
use std::sync::Mutex;
use tempfile::NamedTempFile;

// `KAIROS_GATEWAY_CONFIG_PATH` is process-global; serialize tests that touch it.
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn minimal_settings_json() -> serde_json::Value {
    let upstream = UpstreamConfig {
        id: "users".to_string(),
        targets: vec![TargetConfig {
            id: "t1".to_string(),
            url: "http://localhost:9001".to_string(),
            weight: 1,
        }],
        policy: Default::default(),
        retry: Default::default(),
        timeout: Default::default(),
        health_check: None,
    };
    let route = Route {
        id: "users-route".to_string(),
        name: "users".to_string(),
        methods: vec![Method::Get],
        paths: vec!["/api/users".to_string()],
        match_mode: MatchMode::Prefix,
        upstream_id: "users".to_string(),
        plugins: vec![],
        enabled: true,
    };
    serde_json::json!({
        "version": 1,
        "upstreams": [upstream],
        "routes": [route],
    })
}

/// Created inside the crate's working directory (not the OS temp dir) so
/// the loader's path-traversal check, which requires the resolved path to
/// stay under the current working directory, passes for legitimate configs.
fn write_config(json: &serde_json::Value) -> NamedTempFile {
    let mut file = NamedTempFile::new_in(std::env::current_dir().unwrap()).unwrap();
    file.write_all(serde_json::to_string_pretty(json).unwrap().as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn loads_a_minimal_valid_config_from_env_path() {
    let _guard = ENV_LOCK.lock().unwrap();
    let file = write_config(&minimal_settings_json());
    env::set_var("KAIROS_GATEWAY_CONFIG_PATH", file.path());

    let settings = load_settings().expect("minimal config should load");

    env::remove_var("KAIROS_GATEWAY_CONFIG_PATH");

    assert_eq!(settings.version, 1);
    assert_eq!(settings.upstreams.len(), 1);
    assert_eq!(settings.routes.len(), 1);
}

#[test]
fn rejects_config_referencing_an_unknown_upstream() {
    let _guard = ENV_LOCK.lock().unwrap();
    let mut json = minimal_settings_json();
    json["routes"][0]["upstream_id"] = serde_json::json!("does-not-exist");
    let file = write_config(&json);
    env::set_var("KAIROS_GATEWAY_CONFIG_PATH", file.path());

    let result = load_settings();

    env::remove_var("KAIROS_GATEWAY_CONFIG_PATH");

    assert!(matches!(result, Err(LoadError::Config(_))));
}

#[test]
fn rejects_a_config_path_outside_the_working_directory() {
    let _guard = ENV_LOCK.lock().unwrap();
    env::set_var("KAIROS_GATEWAY_CONFIG_PATH", "/etc/passwd");

    let result = load_settings();

    env::remove_var("KAIROS_GATEWAY_CONFIG_PATH");

    assert!(matches!(result, Err(LoadError::PathTraversal(_))));
}

#[test]
fn rejects_malformed_json() {
    let _guard = ENV_LOCK.lock().unwrap();
    let mut file = NamedTempFile::new_in(std::env::current_dir().unwrap()).unwrap();
    file.write_all(b"{ not json").unwrap();
    file.flush().unwrap();
    env::set_var("KAIROS_GATEWAY_CONFIG_PATH", file.path());

    let result = load_settings();

    env::remove_var("KAIROS_GATEWAY_CONFIG_PATH");

    assert!(matches!(result, Err(LoadError::Json(_))));
}
