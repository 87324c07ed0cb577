use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Read,
    Write,
    Dangerous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Create,
    Alter,
    Drop,
    Truncate,
    Unknown,
}

impl StatementKind {
    /// `kind -> classification` mapping from spec §4.1.
    pub fn classification(&self) -> Classification {
        match self {
            StatementKind::Select => Classification::Read,
            StatementKind::Insert
            | StatementKind::Update
            | StatementKind::Delete
            | StatementKind::Create
            | StatementKind::Alter => Classification::Write,
            StatementKind::Drop | StatementKind::Truncate => Classification::Dangerous,
            StatementKind::Unknown => Classification::Read,
        }
    }

    pub fn is_write_family(&self) -> bool {
        matches!(
            self,
            StatementKind::Insert
                | StatementKind::Update
                | StatementKind::Delete
                | StatementKind::Create
                | StatementKind::Alter
                | StatementKind::Drop
                | StatementKind::Truncate
        )
    }
}

/// Output of C1 parse+classify for a single statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementClassification {
    pub classification: Classification,
    pub kind: StatementKind,
    pub impacted_tables: Vec<String>,
    pub has_where_clause: bool,
    pub summary: String,
}
