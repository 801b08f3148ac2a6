// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layered configuration loader (§4.K): a YAML file with documented
//! per-section defaults, dotenv-style environment layering that never
//! overrides a variable already set, and `${VAR}` token resolution for
//! string fields.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Remote agent ports forwarded through ADB, and the per-request
/// timeouts the device client applies (§4.K, grounded in
/// `original_source/.../core/config.py::DeviceConfig`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeviceConfig {
    pub control_port: u16,
    pub binary_port: u16,
    pub event_port: u16,
    pub connect_timeout_secs: f64,
    pub command_timeout_secs: f64,
    pub heartbeat_interval_secs: f64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            control_port: 18900,
            binary_port: 18901,
            event_port: 18902,
            connect_timeout_secs: 10.0,
            command_timeout_secs: 30.0,
            heartbeat_interval_secs: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunnerConfig {
    pub parallel: bool,
    pub max_workers: usize,
    pub retry_count: u32,
    pub retry_delay_secs: f64,
    pub screenshot_on_failure: bool,
    pub default_timeout_secs: f64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            max_workers: 8,
            retry_count: 0,
            retry_delay_secs: 1.0,
            screenshot_on_failure: true,
            default_timeout_secs: 30.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReporterConfig {
    pub output_dir: String,
    pub formats: Vec<String>,
    pub include_screenshots: bool,
    pub include_logs: bool,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            output_dir: "./reports".to_owned(),
            formats: vec!["html".to_owned(), "json".to_owned()],
            include_screenshots: true,
            include_logs: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OcrOnlineConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: f64,
}

impl Default for OcrOnlineConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.deepseek.com/v1".to_owned(),
            api_key: "${AUTOTEST_OCR_API_KEY}".to_owned(),
            model: "deepseek-chat".to_owned(),
            timeout_secs: 60.0,
        }
    }
}

/// Recognition backend selection (§4.J). `auto` tries the online vision
/// API first, then local engine A, then local engine B.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OcrConfig {
    pub backend: String,
    pub online: Option<OcrOnlineConfig>,
    pub engine_a_lang: String,
    pub engine_a_use_gpu: bool,
    pub engine_b_lang: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            backend: "auto".to_owned(),
            online: Some(OcrOnlineConfig::default()),
            engine_a_lang: "ch".to_owned(),
            engine_a_use_gpu: false,
            engine_b_lang: "eng".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AutotestConfig {
    pub device: DeviceConfig,
    pub runner: RunnerConfig,
    pub reporter: ReporterConfig,
    pub ocr: OcrConfig,
    pub log_level: Option<String>,
    pub plugins: Vec<String>,
}

impl AutotestConfig {
    /// Load from a YAML file. A missing or unparsable file yields
    /// defaults with a warning — never a hard failure (§7).
    pub fn load(path: impl AsRef<Path>) -> Self {
        load_dotenv();
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(_) => return Self::default(),
        };
        match serde_yaml::from_str(&text) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to parse config, using defaults");
                Self::default()
            }
        }
    }

    /// Serialize to YAML and write to `path`, creating parent
    /// directories as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_yaml::to_string(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

/// Search `./.env`, `./<cwd-name>/.env`, `../.env` in that priority
/// order and apply the first one found, without overriding variables
/// already present in the environment.
pub fn load_dotenv() {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let mut candidates = vec![cwd.join(".env")];
    if let Some(name) = cwd.file_name() {
        candidates.push(cwd.join(name).join(".env"));
    }
    if let Some(parent) = cwd.parent() {
        candidates.push(parent.join(".env"));
    }

    for candidate in candidates {
        if candidate.is_file() {
            let _ = dotenvy::from_path(&candidate);
            break;
        }
    }
}

/// Resolve a `${VAR}` token from the environment. Only a string that is
/// *fully* wrapped in `${...}` is substituted; partial interpolation is
/// left untouched (§4.K).
pub fn resolve_env_token(value: &str) -> String {
    if let Some(name) = value.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        return std::env::var(name).unwrap_or_default();
    }
    value.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AutotestConfig::default();
        assert_eq!(config.device.control_port, 18900);
        assert_eq!(config.runner.max_workers, 8);
        assert_eq!(config.ocr.backend, "auto");
    }

    #[test]
    fn load_missing_file_yields_defaults() {
        let config = AutotestConfig::load("/nonexistent/path/autotest.yaml");
        assert_eq!(config, AutotestConfig::default());
    }

    #[test]
    fn load_parses_partial_yaml_with_section_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("autotest.yaml");
        std::fs::write(&path, "runner:\n  max_workers: 16\nlog_level: debug\n").unwrap();

        let config = AutotestConfig::load(&path);
        assert_eq!(config.runner.max_workers, 16);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        // Untouched sections keep their defaults.
        assert_eq!(config.device.control_port, 18900);
    }

    #[test]
    fn resolve_env_token_requires_full_wrap() {
        std::env::set_var("AUTOTEST_TEST_TOKEN_VAR", "resolved");
        assert_eq!(resolve_env_token("${AUTOTEST_TEST_TOKEN_VAR}"), "resolved");
        // Partial interpolation is left as-is.
        assert_eq!(resolve_env_token("prefix-${AUTOTEST_TEST_TOKEN_VAR}"), "prefix-${AUTOTEST_TEST_TOKEN_VAR}");
        assert_eq!(resolve_env_token("literal"), "literal");
        std::env::remove_var("AUTOTEST_TEST_TOKEN_VAR");
    }

    #[test]
    fn resolve_env_token_missing_var_yields_empty() {
        assert_eq!(resolve_env_token("${AUTOTEST_DEFINITELY_UNSET}"), "");
    }
}
