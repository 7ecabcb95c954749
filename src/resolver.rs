//! Best-effort guess at which occurrences declare or define a symbol.
//!
//! Purely line-based heuristics: they will miss multi-line signatures and
//! occasionally flag a call site. Good enough to shrink the list before the
//! interactive filters take over.

use anyhow::Result;
use regex::Regex;
use std::collections::HashSet;

use crate::filters::{filter_by_pattern, filter_filename, filter_statement};
use crate::gateway::LookupGateway;
use crate::matches::{sorted_unique, Match};
use crate::naming::possible_filenames;
use crate::search::{find_matches, Query};

/// Prefixes for non-static and static member fields.
const MEMBER_FIELD_PREFIXES: [&str; 2] = ["m_", "s_"];

/// `interface` covers Java and Objective-C.
const TYPE_KEYWORDS: [&str; 4] = ["class", "struct", "enum", "interface"];

const DEFINITION_KEYWORDS: &str = "def|fn|func|function";

/// Leading words that make a `name(...);` line a statement rather than a prototype.
const NON_DECLARATION_WORDS: [&str; 7] = ["return", "else", "delete", "throw", "new", "case", "co_return"];

struct DefinitionHeuristic {
    scoped_call: String,
    inline_body: Regex,
    keyword: Regex,
}

impl DefinitionHeuristic {
    fn new(pattern: &str) -> Self {
        let escaped = regex::escape(pattern);
        Self {
            // C++: `Class::METHOD(`
            scoped_call: format!("::{pattern}("),
            // C++: `METHOD(...) { ... }` on one line
            inline_body: Regex::new(&format!(r"{escaped} *\(.*\{{.*\}}.*$")).unwrap(),
            // Python / Rust / Go / JS: `def METHOD`, `fn METHOD`, ...
            keyword: Regex::new(&format!(r"\b(?:{DEFINITION_KEYWORDS}) +{escaped}\b")).unwrap(),
        }
    }

    fn matches(&self, text: &str) -> bool {
        text.contains(&self.scoped_call) || self.inline_body.is_match(text) || self.keyword.is_match(text)
    }
}

/// Does `text` look like a function definition for `pattern`?
#[cfg(test)]
fn is_possible_definition(text: &str, pattern: &str) -> bool {
    DefinitionHeuristic::new(pattern).matches(text)
}

/// Statement-terminated function prototype such as `void Foo(int);`.
struct PrototypeHeuristic {
    signature: Regex,
}

impl PrototypeHeuristic {
    fn new(pattern: &str) -> Self {
        let escaped = regex::escape(pattern);
        Self {
            signature: Regex::new(&format!(
                r"^\s*(?P<lead>[\w:<>,*&~\s]*?[\w>*&])[\s*&]+{escaped}\s*\([^{{}};]*\)[^{{}};=]*;\s*$"
            ))
            .unwrap(),
        }
    }

    fn matches(&self, text: &str) -> bool {
        let Some(caps) = self.signature.captures(text) else {
            return false;
        };
        let first_word = caps["lead"].split_whitespace().next().unwrap_or("");
        !NON_DECLARATION_WORDS.contains(&first_word)
    }
}

/// Does `text` look like a prototype of `pattern`?
#[cfg(test)]
fn is_prototype(text: &str, pattern: &str) -> bool {
    PrototypeHeuristic::new(pattern).matches(text)
}

/// Keep the matches that look like definitions of `pattern`.
pub fn keep_possible_definition(matches: &[Match], pattern: &str) -> Vec<Match> {
    let heuristic = DefinitionHeuristic::new(pattern);
    matches
        .iter()
        .filter(|m| heuristic.matches(&m.text))
        .cloned()
        .collect()
}

/// Classify already looked-up occurrences of `pattern`.
///
/// Level 0 disables the resolver. Level 1 keeps declarations and likely
/// definitions. Level 2 additionally requires the filename to mention the
/// symbol in either naming convention.
pub fn classify(matches: &[Match], pattern: &str, level: u32) -> Vec<Match> {
    if level == 0 {
        return Vec::new();
    }

    if MEMBER_FIELD_PREFIXES.iter().any(|p| pattern.starts_with(p)) {
        // Member fields are declared in headers.
        return sorted_unique(filter_filename(matches, r"\.h$", false));
    }

    let matches = filter_by_pattern(matches, pattern);
    let mut result: HashSet<Match> = HashSet::new();

    for keyword in TYPE_KEYWORDS {
        let typed = filter_by_pattern(&matches, keyword);
        result.extend(filter_statement(&typed, false));
    }
    result.extend(filter_by_pattern(&matches, "typedef"));
    result.extend(filter_by_pattern(&matches, "define"));
    let prototype = PrototypeHeuristic::new(pattern);
    result.extend(matches.iter().filter(|m| prototype.matches(&m.text)).cloned());
    result.extend(keep_possible_definition(&matches, pattern));

    if level > 1 {
        let candidates: Vec<Match> = result.into_iter().collect();
        result = HashSet::new();
        for name in possible_filenames(pattern) {
            result.extend(filter_filename(&candidates, &regex::escape(&name), false));
        }
    }

    sorted_unique(result)
}

/// Look up `pattern` and keep its likely declarations and definitions.
pub fn find_declaration_or_definition(
    gateway: &dyn LookupGateway,
    pattern: &str,
    level: u32,
) -> Result<Vec<Match>> {
    if level == 0 {
        return Ok(Vec::new());
    }
    let matches = find_matches(gateway, &Query::new([pattern]))?;
    Ok(classify(&matches, pattern, level))
}
