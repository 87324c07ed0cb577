use crate::ids::ProfileId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// SQL dialect a profile speaks. Only `Postgres` ships an adapter today;
/// the core stays dialect-agnostic per spec §9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Postgres,
    MySql,
    Sqlite,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
            Dialect::Sqlite => "sqlite",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "postgres" => Some(Dialect::Postgres),
            "mysql" => Some(Dialect::MySql),
            "sqlite" => Some(Dialect::Sqlite),
            _ => None,
        }
    }
}

/// POWER-mode flags. Disabling `allow_write` forces `allow_dangerous = false`
/// on the next update (enforced by `Profile::set_power`, not by callers).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerFlags {
    pub allow_write: bool,
    pub allow_dangerous: bool,
    pub confirm_phrase: Option<String>,
}

impl Default for PowerFlags {
    fn default() -> Self {
        Self {
            allow_write: false,
            allow_dangerous: false,
            confirm_phrase: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub name: String,
    pub dialect: Dialect,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub ssl: bool,
    pub created_at: DateTime<Utc>,
    pub power: PowerFlags,
}

/// Caller-supplied fields for `create_profile`. `id`/`created_at` are
/// assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSpec {
    pub name: String,
    pub dialect: Dialect,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub ssl: bool,
}

/// Partial update to POWER flags. Only present fields are changed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PowerUpdate {
    pub allow_write: Option<bool>,
    pub allow_dangerous: Option<bool>,
    pub confirm_phrase: Option<Option<String>>,
}

impl Profile {
    /// Apply a POWER update, enforcing the invariant that disabling
    /// `allow_write` forces `allow_dangerous` off in the same update.
    pub fn apply_power_update(&mut self, update: PowerUpdate) {
        if let Some(allow_write) = update.allow_write {
            self.power.allow_write = allow_write;
            if !allow_write {
                self.power.allow_dangerous = false;
            }
        }
        if let Some(allow_dangerous) = update.allow_dangerous {
            self.power.allow_dangerous = allow_dangerous && self.power.allow_write;
        }
        if let Some(confirm_phrase) = update.confirm_phrase {
            self.power.confirm_phrase = confirm_phrase;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_profile() -> Profile {
        Profile {
            id: ProfileId::new(),
            name: "local".to_string(),
            dialect: Dialect::Postgres,
            host: "localhost".to_string(),
            port: 5432,
            database: "app".to_string(),
            user: "app".to_string(),
            ssl: false,
            created_at: Utc::now(),
            power: PowerFlags {
                allow_write: true,
                allow_dangerous: true,
                confirm_phrase: None,
            },
        }
    }

    #[test]
    fn disabling_write_forces_dangerous_off() {
        let mut p = sample_profile();
        assert!(p.power.allow_write && p.power.allow_dangerous);

        p.apply_power_update(PowerUpdate {
            allow_write: Some(false),
            ..Default::default()
        });

        assert!(!p.power.allow_write);
        assert!(!p.power.allow_dangerous);
    }

    #[test]
    fn enabling_dangerous_without_write_is_a_no_op() {
        let mut p = sample_profile();
        p.power.allow_write = false;
        p.power.allow_dangerous = false;

        p.apply_power_update(PowerUpdate {
            allow_dangerous: Some(true),
            ..Default::default()
        });

        assert!(!p.power.allow_dangerous);
    }
}
