//! Wildcard path pattern compilation.
//!
//! Template paths are literal metric paths where `*` stands for a run of
//! one or more arbitrary characters (not bounded by dot segments). Each
//! pattern compiles to an anchored regex with one capture group per
//! wildcard, so `stats.*.queue` matches `stats.web01.queue` and captures
//! `web01`, but does not match `stats.web01.queue.extra`.

use crate::core::{Result, VigilError};
use regex::Regex;

/// The wildcard token recognized in template paths.
pub const WILDCARD: char = '*';

/// Compile a wildcard path pattern into an anchored matcher.
///
/// Every regex metacharacter in the pattern is escaped except the wildcard
/// token; each wildcard becomes a `(.+)` capture group. The same input
/// always compiles to an equivalent matcher.
pub fn compile(template: &str, pattern: &str) -> Result<Regex> {
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push('^');
    for (i, literal) in pattern.split(WILDCARD).enumerate() {
        if i > 0 {
            source.push_str("(.+)");
        }
        source.push_str(&regex::escape(literal));
    }
    source.push('$');

    Regex::new(&source).map_err(|e| VigilError::Pattern {
        template: template.to_string(),
        message: e.to_string(),
    })
}

/// Number of wildcard tokens in a pattern, which equals the number of
/// capture groups in its compiled matcher.
pub fn wildcard_count(pattern: &str) -> usize {
    pattern.matches(WILDCARD).count()
}
