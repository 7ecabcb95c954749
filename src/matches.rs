use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// One `file:line:text` occurrence reported by the index.
///
/// Equality covers `filename`, `line_num` and `text`; `column` never participates.
/// Ordering (see [`Match::compare`]) is by `(filename, line_num)` only.
#[derive(Debug, Clone)]
pub struct Match {
    pub filename: String,
    pub line_num: usize,
    /// Byte offset of the pattern that produced this match. Fixed at construction.
    pub column: usize,
    pub text: String,
}

impl Match {
    /// Parse a raw `file:line:text` line. `text` may itself contain `:`.
    ///
    /// Returns `None` when the line does not split into three fields, when the
    /// line number is not a positive integer, or when `pattern` is absent from the text.
    pub fn parse(line: &str, pattern: &str) -> Option<Match> {
        let mut fields = line.splitn(3, ':');
        let filename = fields.next()?;
        let line_num = fields.next()?;
        let text = fields.next()?;

        let line_num: usize = line_num.trim().parse().ok().filter(|n| *n >= 1)?;
        let column = text.find(pattern)?;

        Some(Match {
            filename: filename.to_string(),
            line_num,
            column,
            text: text.to_string(),
        })
    }

    /// Total order used at every sort site: filename first, then line number.
    pub fn compare(&self, other: &Match) -> Ordering {
        self.filename
            .cmp(&other.filename)
            .then_with(|| self.line_num.cmp(&other.line_num))
    }
}

impl PartialEq for Match {
    fn eq(&self, other: &Self) -> bool {
        self.filename == other.filename && self.line_num == other.line_num && self.text == other.text
    }
}

impl Eq for Match {}

impl Hash for Match {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.filename.hash(state);
        self.line_num.hash(state);
        self.text.hash(state);
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.filename, self.line_num, self.column, self.text)
    }
}

/// Drop duplicates (first occurrence wins) and sort with [`Match::compare`].
pub fn sorted_unique<I>(matches: I) -> Vec<Match>
where
    I: IntoIterator<Item = Match>,
{
    let mut seen = HashSet::new();
    let mut out: Vec<Match> = matches
        .into_iter()
        .filter(|m| seen.insert(m.clone()))
        .collect();
    out.sort_by(Match::compare);
    out
}
