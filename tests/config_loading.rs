// tests/config_loading.rs
use live_event_attribution::config::engine::{
    ENV_DECAY_WINDOW_MINUTES, ENV_ENGINE_CONFIG_PATH, ENV_HALF_LIFE_MINUTES, ENV_SPIKE_WINDOW,
    ENV_Z_THRESHOLD,
};
use live_event_attribution::{Baseline, ConfigurationError, EngineConfig};
use std::{env, fs};

fn clear_env() {
    for k in [
        ENV_ENGINE_CONFIG_PATH,
        ENV_DECAY_WINDOW_MINUTES,
        ENV_HALF_LIFE_MINUTES,
        ENV_Z_THRESHOLD,
        ENV_SPIKE_WINDOW,
    ] {
        env::remove_var(k);
    }
}

#[test]
fn load_from_explicit_file() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("attribution.toml");
    fs::write(
        &p,
        r#"
decay_window_minutes = 20.0
half_life_minutes = 5.0
spike_baseline = "trailing"
"#,
    )
    .unwrap();

    let cfg = EngineConfig::load_from_file(&p).unwrap();
    assert_eq!(cfg.decay_window_minutes, 20.0);
    assert_eq!(cfg.half_life_minutes, 5.0);
    assert_eq!(cfg.z_threshold, 2.5);
    assert_eq!(cfg.spike_window, 15);
    assert_eq!(cfg.spike_baseline, Baseline::Trailing);
}

#[test]
fn missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = EngineConfig::load_from_file(dir.path().join("nope.toml")).unwrap_err();
    assert!(format!("{err:#}").contains("nope.toml"));
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    // run from a scratch cwd so the repo config/ is never picked up
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    clear_env();

    // 1) Nothing on disk → built-in defaults
    let cfg = EngineConfig::load().unwrap();
    assert_eq!(cfg, EngineConfig::default());

    // 2) ./config/attribution.toml fallback
    let cfg_dir = tmp.path().join("config");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(cfg_dir.join("attribution.toml"), "half_life_minutes = 4.0").unwrap();
    let cfg = EngineConfig::load().unwrap();
    assert_eq!(cfg.half_life_minutes, 4.0);

    // 3) Env path wins over the fallback
    let p_env = tmp.path().join("elsewhere.toml");
    fs::write(&p_env, "half_life_minutes = 9.0").unwrap();
    env::set_var(ENV_ENGINE_CONFIG_PATH, p_env.display().to_string());
    let cfg = EngineConfig::load().unwrap();
    assert_eq!(cfg.half_life_minutes, 9.0);

    // 4) Field overrides win over any file
    env::set_var(ENV_HALF_LIFE_MINUTES, "3");
    env::set_var(ENV_SPIKE_WINDOW, " 10 ");
    let cfg = EngineConfig::load().unwrap();
    assert_eq!(cfg.half_life_minutes, 3.0);
    assert_eq!(cfg.spike_window, 10);

    clear_env();
    env::set_current_dir(&old).unwrap();
}

#[serial_test::serial]
#[test]
fn bad_overrides_fail_fast() {
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    clear_env();

    env::set_var(ENV_Z_THRESHOLD, "high");
    let err = EngineConfig::load().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigurationError>(),
        Some(ConfigurationError::Override { key, .. }) if *key == ENV_Z_THRESHOLD
    ));
    env::remove_var(ENV_Z_THRESHOLD);

    // parses fine but is not a valid window: never clamped
    env::set_var(ENV_DECAY_WINDOW_MINUTES, "-30");
    let err = EngineConfig::load().unwrap_err();
    assert_eq!(
        err.downcast_ref::<ConfigurationError>(),
        Some(&ConfigurationError::DecayWindow(-30.0))
    );

    clear_env();
    env::set_current_dir(&old).unwrap();
}
