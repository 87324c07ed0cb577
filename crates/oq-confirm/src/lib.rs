//! C6 — Confirmation Verifier. Exact-match, case-sensitive phrase checks
//! that gate every write before C7 touches a connection (spec §4.6).

use thiserror::Error;

/// Default write confirmation phrase, used when a profile has no custom
/// `confirm_phrase` set.
pub const DEFAULT_WRITE_PHRASE: &str = "CONFIRM WRITE";

/// Required whenever an update/delete has no `WHERE` clause.
pub const NO_WHERE_PHRASE: &str = "CONFIRM NO WHERE LIMIT";

/// Required in addition to the write phrase for dangerous statements.
pub const DANGEROUS_PHRASE: &str = "CONFIRM DESTRUCTIVE ACTION";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfirmError {
    #[error("Confirmation phrase mismatch")]
    Mismatch,
}

/// Trim surrounding whitespace, then compare byte-for-byte, case-sensitive.
/// No fuzzy match, no prefix match (spec §4.6).
fn phrases_match(expected: &str, input: &str) -> bool {
    expected == input.trim()
}

/// Which phrase a write preview must demand, per spec §4.5 step 6: no-WHERE
/// takes precedence over the custom/default write phrase.
pub fn required_write_phrase(has_where_clause: bool, custom_phrase: Option<&str>) -> String {
    if !has_where_clause {
        NO_WHERE_PHRASE.to_string()
    } else {
        custom_phrase.unwrap_or(DEFAULT_WRITE_PHRASE).to_string()
    }
}

/// Verify the primary write phrase, and the dangerous phrase when required.
/// Both must match for the write to proceed; a single mismatch anywhere is
/// reported as [`ConfirmError::Mismatch`] without revealing which one failed.
pub fn verify(
    required_phrase: &str,
    input_phrase: &str,
    requires_dangerous: bool,
    dangerous_input: Option<&str>,
) -> Result<(), ConfirmError> {
    if !phrases_match(required_phrase, input_phrase) {
        return Err(ConfirmError::Mismatch);
    }
    if requires_dangerous {
        let dangerous_input = dangerous_input.unwrap_or("");
        if !phrases_match(DANGEROUS_PHRASE, dangerous_input) {
            return Err(ConfirmError::Mismatch);
        }
    }
    Ok(())
}
