use oq_schemas::Mode;
use serde::{Deserialize, Serialize};

/// Per-profile policy configuration (spec §4.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub mode: Mode,
    pub allow_write: bool,
    pub allow_destructive: bool,
}

/// Per-mode thresholds (spec §4.3). Defaults below match the spec exactly;
/// a deployment can override them via `oq-config`'s layered YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeConfig {
    pub require_explain: bool,
    pub enforce_limit: bool,
    pub max_estimated_rows: i64,
    pub max_estimated_cost: f64,
    pub max_joins: usize,
    pub disallow_select_star: bool,
    pub default_limit: i64,
    pub max_limit: i64,
    pub blocked_tables: Vec<String>,
}

impl ModeConfig {
    pub fn safe_defaults() -> Self {
        Self {
            require_explain: true,
            enforce_limit: true,
            max_estimated_rows: 1_000_000,
            max_estimated_cost: 1_000_000.0,
            max_joins: 6,
            disallow_select_star: true,
            default_limit: 200,
            max_limit: 5_000,
            blocked_tables: Vec::new(),
        }
    }

    pub fn standard_defaults() -> Self {
        Self {
            require_explain: false,
            enforce_limit: true,
            max_estimated_rows: 10_000_000,
            max_estimated_cost: 10_000_000.0,
            max_joins: 20,
            disallow_select_star: false,
            default_limit: 200,
            max_limit: 50_000,
            blocked_tables: Vec::new(),
        }
    }

    pub fn for_mode(mode: Mode) -> Self {
        match mode {
            Mode::Safe => Self::safe_defaults(),
            Mode::Standard => Self::standard_defaults(),
        }
    }
}
