//! Free-text answer checking.
//!
//! An expected value may list several accepted answers separated by `/`
//! (`"was / were"`, `"dreamt/dreamed"`). Comparison is exact after trimming and
//! lowercasing; there is no fuzzy matching.

/// Trim and lowercase a raw answer.
#[must_use]
pub fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Returns true if `raw_answer` matches any alternative of `expected`.
///
/// Blank answers never match.
#[must_use]
pub fn check(raw_answer: &str, expected: &str) -> bool {
    let answer = normalize(raw_answer);
    if answer.is_empty() {
        return false;
    }
    alternatives(expected).any(|alt| alt == answer)
}

/// Accepted answers encoded in `expected`, normalized. Empty alternatives are skipped.
pub fn alternatives(expected: &str) -> impl Iterator<Item = String> + '_ {
    expected
        .split('/')
        .map(normalize)
        .filter(|alt| !alt.is_empty())
}
