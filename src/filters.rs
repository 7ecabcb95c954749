//! Pure match-set filters. Every filter keeps the relative order of its input.

use anyhow::Result;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::gateway::{lookup_matches, LookupGateway};
use crate::matches::Match;

/// A pattern starting with this marker keeps lines that do NOT contain the word.
pub const NEGATION_MARKER: char = '~';

fn statement_end_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r";\s*$").unwrap())
}

fn bare_assignment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^=]=[^=]").unwrap())
}

/// Compile user text as a regex, falling back to a literal match when it is not valid regex syntax.
pub(crate) fn user_regex(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => {
            crate::debug_log!("[gj] {pattern:?} is not a valid regex ({e}); matching literally");
            Regex::new(&regex::escape(pattern)).unwrap()
        }
    }
}

fn word_regex(word: &str) -> Regex {
    Regex::new(&format!(r"\b{word}\b"))
        .unwrap_or_else(|_| Regex::new(&format!(r"\b{}\b", regex::escape(word))).unwrap())
}

/// Keep matches whose text contains `pattern` as a whole word.
///
/// `~word` inverts the predicate. The pattern `=` matches a standalone assignment
/// operator (an `=` neither preceded nor followed by another `=`).
pub fn filter_by_pattern(matches: &[Match], pattern: &str) -> Vec<Match> {
    let (negated, word) = match pattern.strip_prefix(NEGATION_MARKER) {
        Some(rest) => (true, rest),
        None => (false, pattern),
    };

    let re = if word == "=" {
        bare_assignment_regex().clone()
    } else {
        word_regex(word)
    };

    matches
        .iter()
        .filter(|m| re.is_match(&m.text) != negated)
        .cloned()
        .collect()
}

pub(crate) fn is_statement(text: &str) -> bool {
    statement_end_regex().is_match(text)
}

/// Keep statement-terminated lines (`exclude == false`) or everything else (`exclude == true`).
pub fn filter_statement(matches: &[Match], exclude: bool) -> Vec<Match> {
    matches
        .iter()
        .filter(|m| is_statement(&m.text) != exclude)
        .cloned()
        .collect()
}

/// Keep matches whose filename matches `pattern` as a regex, or drop them when `exclude` is set.
pub fn filter_filename(matches: &[Match], pattern: &str, exclude: bool) -> Vec<Match> {
    let re = user_regex(pattern);
    matches
        .iter()
        .filter(|m| re.is_match(&m.filename) != exclude)
        .cloned()
        .collect()
}

/// Restrict `matches` to files that also mention `filter_pattern` somewhere.
///
/// Runs an independent lookup for `filter_pattern` through the gateway.
pub fn filter_by_co_occurrence(
    matches: &[Match],
    gateway: &dyn LookupGateway,
    filter_pattern: &str,
) -> Result<Vec<Match>> {
    let filenames: HashSet<String> = lookup_matches(gateway, filter_pattern)?
        .into_iter()
        .map(|m| m.filename)
        .collect();

    Ok(matches
        .iter()
        .filter(|m| filenames.contains(&m.filename))
        .cloned()
        .collect())
}
