//! Operator confirmation answers for destructive actions.

/// Interpretation of one answer to a yes/no prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    /// Anything else; the caller should ask again.
    Unrecognized,
}

/// Parse an answer. Only `y`/`yes` and `n`/`no` are accepted, ignoring case
/// and surrounding whitespace.
#[must_use]
pub fn parse_answer(raw: &str) -> Answer {
    match raw.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Answer::Yes,
        "n" | "no" => Answer::No,
        _ => Answer::Unrecognized,
    }
}
