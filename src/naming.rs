//! Identifier naming-convention helpers used to guess which file defines a symbol.

use regex::Regex;
use std::sync::OnceLock;

/// `foo_bar` -> `FooBar`. Empty segments (leading, trailing or doubled `_`) stay as `_`.
pub fn to_camel_case(word: &str) -> String {
    word.split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => "_".to_string(),
            }
        })
        .collect()
}

fn word_boundary_regexes() -> &'static (Regex, Regex) {
    static RE: OnceLock<(Regex, Regex)> = OnceLock::new();
    RE.get_or_init(|| {
        (
            Regex::new(r"(.)([A-Z][a-z]+)").unwrap(),
            Regex::new(r"([a-z0-9])([A-Z])").unwrap(),
        )
    })
}

/// `FooBar` -> `foo_bar`, `HTTPServer` -> `http_server`.
pub fn to_underscore(name: &str) -> String {
    let (first, second) = word_boundary_regexes();
    let s1 = first.replace_all(name, "${1}_${2}");
    second.replace_all(&s1, "${1}_${2}").to_lowercase()
}

/// The pattern itself plus its counterpart in the other naming convention.
///
/// Any uppercase letter means CamelCase; otherwise underscore_case is assumed.
/// Identifiers mixing both conventions only get the single counterpart.
pub fn possible_filenames(pattern: &str) -> [String; 2] {
    if pattern.chars().any(|c| c.is_ascii_uppercase()) {
        [to_underscore(pattern), pattern.to_string()]
    } else {
        [pattern.to_string(), to_camel_case(pattern)]
    }
}
