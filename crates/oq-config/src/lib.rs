//! Layered config. Global defaults merge under an optional deployment YAML
//! file; the result is canonicalized (sorted keys) and SHA-256-hashed so a
//! generation or run record can carry `config_hash` and later audits can
//! tell which thresholds were actually in effect.

mod merge;

use merge::{canonicalize_json, deep_merge};
use oq_policy::ModeConfig;
use oq_schemas::Mode;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path} as YAML: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

const DEFAULT_CONFIG_YAML: &str = r#"
store:
  path: "openquery.sqlite"
  statement_timeout_ms: 30000
modes:
  safe: {}
  standard: {}
"#;

/// Merged, canonicalized, hashed configuration.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_json: Value,
    pub canonical_json: String,
    pub config_hash: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreSettings {
    pub store_path: String,
    pub statement_timeout_ms: u64,
}

/// Load built-in defaults, then merge an optional deployment file on top.
/// A missing `overlay_path` is not an error — the built-in defaults alone
/// are a valid config.
pub fn load_config(overlay_path: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let mut merged = parse_yaml_str(DEFAULT_CONFIG_YAML, "<built-in defaults>")?;

    if let Some(path) = overlay_path {
        if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;
            let overlay = parse_yaml_str(&raw, &path.display().to_string())?;
            deep_merge(&mut merged, overlay);
        }
    }

    let canonical = canonicalize_json(&merged);

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let config_hash = hex::encode(hasher.finalize());

    Ok(LoadedConfig {
        config_json: serde_json::from_str(&canonical)?,
        canonical_json: canonical,
        config_hash,
    })
}

fn parse_yaml_str(raw: &str, label: &str) -> Result<Value, ConfigError> {
    let yaml_val: serde_yaml::Value =
        serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: label.to_string(),
            source,
        })?;
    Ok(serde_json::to_value(yaml_val)?)
}

impl LoadedConfig {
    pub fn store_settings(&self) -> StoreSettings {
        let store_path = self
            .config_json
            .pointer("/store/path")
            .and_then(Value::as_str)
            .unwrap_or("openquery.sqlite")
            .to_string();

        let statement_timeout_ms = self
            .config_json
            .pointer("/store/statement_timeout_ms")
            .and_then(Value::as_u64)
            .unwrap_or(30_000);

        StoreSettings {
            store_path,
            statement_timeout_ms,
        }
    }

    /// Built-in per-mode defaults (spec §4.3), overlaid with any fields
    /// present under `/modes/<mode>` in the merged config.
    pub fn mode_config(&self, mode: Mode) -> ModeConfig {
        let mut cfg = ModeConfig::for_mode(mode);

        let pointer = match mode {
            Mode::Safe => "/modes/safe",
            Mode::Standard => "/modes/standard",
        };
        let Some(overrides) = self.config_json.pointer(pointer) else {
            return cfg;
        };

        if let Some(v) = overrides.get("require_explain").and_then(Value::as_bool) {
            cfg.require_explain = v;
        }
        if let Some(v) = overrides.get("enforce_limit").and_then(Value::as_bool) {
            cfg.enforce_limit = v;
        }
        if let Some(v) = overrides.get("max_estimated_rows").and_then(Value::as_i64) {
            cfg.max_estimated_rows = v;
        }
        if let Some(v) = overrides.get("max_estimated_cost").and_then(Value::as_f64) {
            cfg.max_estimated_cost = v;
        }
        if let Some(v) = overrides.get("max_joins").and_then(Value::as_u64) {
            cfg.max_joins = v as usize;
        }
        if let Some(v) = overrides
            .get("disallow_select_star")
            .and_then(Value::as_bool)
        {
            cfg.disallow_select_star = v;
        }
        if let Some(v) = overrides.get("default_limit").and_then(Value::as_i64) {
            cfg.default_limit = v;
        }
        if let Some(v) = overrides.get("max_limit").and_then(Value::as_i64) {
            cfg.max_limit = v;
        }
        if let Some(v) = overrides.get("blocked_tables").and_then(Value::as_array) {
            cfg.blocked_tables = v
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
        }

        cfg
    }
}
