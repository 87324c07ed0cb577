use serde::{Deserialize, Serialize};

/// Result of the policy engine (C3). Invariant: `allowed => rewritten_sql.is_some()`;
/// `!allowed => rewritten_sql.is_none() && !reason.is_empty()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub allowed: bool,
    pub rewritten_sql: Option<String>,
    pub warnings: Vec<String>,
    pub reason: String,
    pub details: Option<String>,
    pub suggested_fix: Option<String>,
}

impl ValidationResult {
    pub fn allow(rewritten_sql: String, warnings: Vec<String>) -> Self {
        Self {
            allowed: true,
            rewritten_sql: Some(rewritten_sql),
            warnings,
            reason: String::new(),
            details: None,
            suggested_fix: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            rewritten_sql: None,
            warnings: Vec::new(),
            reason: reason.into(),
            details: None,
            suggested_fix: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_suggested_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix.into());
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    /// Checked at every construction site in debug builds via `debug_assert!`
    /// call sites; exposed so tests can assert the invariant directly.
    pub fn is_consistent(&self) -> bool {
        if self.allowed {
            self.rewritten_sql.is_some()
        } else {
            self.rewritten_sql.is_none() && !self.reason.is_empty()
        }
    }
}
