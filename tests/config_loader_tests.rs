//! Layered configuration loading: `.env` file precedence, profile selection,
//! and the process environment overlay.

use std::{
    env, fs,
    path::PathBuf,
    sync::{Mutex, MutexGuard, OnceLock},
};

use tempfile::TempDir;

use qbwc_bridge::config::ConfigLoader;

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn env_guard() -> MutexGuard<'static, ()> {
    env_lock()
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

fn clear_env() {
    unsafe {
        env::remove_var("QBWC_PROFILE");
        env::remove_var("QBWC_API_BIND_ADDR");
        env::remove_var("QBWC_LOG_LEVEL");
        env::remove_var("QBWC_OPERATOR_TOKEN");
        env::remove_var("QBWC_OPERATOR_TOKENS");
        env::remove_var("QBWC_SYNC_MAX_RETRIES");
    }
}

fn write_env_file(dir: &TempDir, name: &str, contents: &str) {
    fs::write(dir.path().join(name), contents).unwrap();
}

fn loader_in(dir: &TempDir) -> ConfigLoader {
    ConfigLoader::with_base_dir(PathBuf::from(dir.path()))
}

#[test]
fn defaults_apply_when_only_tokens_are_configured() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "QBWC_OPERATOR_TOKEN=test-token\n");

    let cfg = loader_in(&temp_dir).load().expect("config loads with defaults");

    assert_eq!(cfg.profile, "local");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:8080");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.sync.max_retries, 5);
    assert_eq!(cfg.session.idle_timeout_seconds, 0);
    cfg.bind_addr().expect("default bind addr parses");
    clear_env();
}

#[test]
fn layered_env_files_apply_in_order() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        "QBWC_API_BIND_ADDR=127.0.0.1:3000\nQBWC_LOG_LEVEL=warn\n",
    );
    // Profile selected in .env.local before the profile-specific files load.
    write_env_file(
        &temp_dir,
        ".env.local",
        "QBWC_PROFILE=test\nQBWC_API_BIND_ADDR=127.0.0.1:4000\nQBWC_OPERATOR_TOKEN=layered-test-token\n",
    );
    write_env_file(&temp_dir, ".env.test", "QBWC_API_BIND_ADDR=192.168.0.10:5000\n");
    write_env_file(
        &temp_dir,
        ".env.test.local",
        "QBWC_API_BIND_ADDR=10.0.0.5:6000\n",
    );

    let cfg = loader_in(&temp_dir)
        .load()
        .expect("config loads with layered env files");

    assert_eq!(cfg.profile, "test");
    assert_eq!(cfg.api_bind_addr, "10.0.0.5:6000");
    // A key set only in the base layer is not disturbed by later files.
    assert_eq!(cfg.log_level, "warn");
    clear_env();
}

#[test]
fn process_environment_overrides_every_file() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        "QBWC_API_BIND_ADDR=127.0.0.1:3000\nQBWC_OPERATOR_TOKEN=env-override-token\n",
    );
    write_env_file(&temp_dir, ".env.local", "QBWC_API_BIND_ADDR=127.0.0.1:4000\n");

    unsafe {
        env::set_var("QBWC_API_BIND_ADDR", "0.0.0.0:9090");
    }

    let cfg = loader_in(&temp_dir).load().expect("config loads with env override");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:9090");
    clear_env();
}

#[test]
fn profile_from_process_env_selects_the_profile_files() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "QBWC_OPERATOR_TOKEN=profile-env-token\n");
    write_env_file(&temp_dir, ".env.staging", "QBWC_LOG_LEVEL=debug\n");

    unsafe {
        env::set_var("QBWC_PROFILE", "staging");
    }

    let cfg = loader_in(&temp_dir).load().expect("config loads for the env profile");
    assert_eq!(cfg.profile, "staging");
    assert_eq!(cfg.log_level, "debug");
    clear_env();
}

#[test]
fn operator_tokens_accept_a_comma_separated_list() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        "QBWC_OPERATOR_TOKENS=first-token, second-token,\n",
    );

    let cfg = loader_in(&temp_dir).load().expect("config loads with token list");
    assert_eq!(cfg.operator_tokens, vec!["first-token", "second-token"]);
    clear_env();
}

#[test]
fn invalid_bind_addr_is_rejected() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        "QBWC_API_BIND_ADDR=not-an-addr\nQBWC_OPERATOR_TOKEN=bad-addr-token\n",
    );

    let err = loader_in(&temp_dir)
        .load()
        .expect_err("invalid bind addr should fail");
    assert!(format!("{err}").contains("invalid api bind address"));
    clear_env();
}
