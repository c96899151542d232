use serde::Deserialize;
use std::env;

/// Engine tunables. Escalation thresholds are configuration rather than
/// constants; observed deployments disagree on the extreme-level count.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Debounce window for progress saves, milliseconds.
    pub debounce_ms: u64,
    /// Periodic flush backstop while unsaved changes exist, seconds.
    pub autosave_interval_secs: u64,
    /// Remaining-time boundary that fires the one-shot low-time warning.
    pub time_warning_secs: u64,
    /// Absence length after window blur that classifies as a time anomaly.
    pub blur_anomaly_secs: i64,
    /// Tab switches before auto-submit under high security.
    pub high_auto_submit_threshold: u32,
    /// Tab switches before auto-submit under extreme security.
    pub extreme_auto_submit_threshold: u32,
    /// Sustained blur that auto-submits on its own under extreme security.
    pub extreme_severe_blur_secs: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            autosave_interval_secs: 30,
            time_warning_secs: 300,
            blur_anomaly_secs: 10,
            high_auto_submit_threshold: 4,
            extreme_auto_submit_threshold: 3,
            extreme_severe_blur_secs: 30,
        }
    }
}

impl EngineConfig {
    /// Build configuration from config/*.toml plus APP_* environment
    /// overrides (e.g. APP_ENGINE__DEBOUNCE_MS). Missing keys fall back to
    /// defaults so an empty environment still yields a working engine.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let defaults = EngineConfig::default();

        Ok(EngineConfig {
            debounce_ms: settings
                .get_int("engine.debounce_ms")
                .map(|v| v.max(0) as u64)
                .unwrap_or(defaults.debounce_ms),
            autosave_interval_secs: settings
                .get_int("engine.autosave_interval_secs")
                .map(|v| v.max(1) as u64)
                .unwrap_or(defaults.autosave_interval_secs),
            time_warning_secs: settings
                .get_int("engine.time_warning_secs")
                .map(|v| v.max(0) as u64)
                .unwrap_or(defaults.time_warning_secs),
            blur_anomaly_secs: settings
                .get_int("engine.blur_anomaly_secs")
                .map(|v| v.max(1))
                .unwrap_or(defaults.blur_anomaly_secs),
            high_auto_submit_threshold: settings
                .get_int("engine.high_auto_submit_threshold")
                .map(|v| v.max(1) as u32)
                .unwrap_or(defaults.high_auto_submit_threshold),
            extreme_auto_submit_threshold: settings
                .get_int("engine.extreme_auto_submit_threshold")
                .map(|v| v.max(1) as u32)
                .unwrap_or(defaults.extreme_auto_submit_threshold),
            extreme_severe_blur_secs: settings
                .get_int("engine.extreme_severe_blur_secs")
                .map(|v| v.max(1))
                .unwrap_or(defaults.extreme_severe_blur_secs),
        })
    }
}
