use anyhow::Result;

use crate::filters::{filter_by_co_occurrence, filter_by_pattern, filter_filename};
use crate::gateway::{lookup_matches, LookupGateway};
use crate::matches::{sorted_unique, Match};

/// A seeded lookup: the first pattern goes to the index, the rest narrow the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub patterns: Vec<String>,
    /// Keep only files that also mention this pattern.
    pub filter: Option<String>,
    /// Keep only files whose path starts with this prefix.
    pub path_prefix: Option<String>,
}

impl Query {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

/// `^(?:PREFIX)`; a prefix that is not valid regex syntax is anchored as literal text.
fn anchored_prefix(prefix: &str) -> String {
    match regex::Regex::new(prefix) {
        Ok(_) => format!("^(?:{prefix})"),
        Err(_) => format!("^{}", regex::escape(prefix)),
    }
}

pub fn find_matches(gateway: &dyn LookupGateway, query: &Query) -> Result<Vec<Match>> {
    let Some((first, rest)) = query.patterns.split_first() else {
        return Ok(Vec::new());
    };

    let mut matches = lookup_matches(gateway, first)?;
    for pattern in rest {
        matches = filter_by_pattern(&matches, pattern);
    }

    if let Some(prefix) = query.path_prefix.as_deref().filter(|p| !p.is_empty()) {
        matches = filter_filename(&matches, &anchored_prefix(prefix), false);
    }

    if let Some(filter) = query.filter.as_deref().filter(|f| !f.is_empty()) {
        matches = filter_by_co_occurrence(&matches, gateway, filter)?;
    }

    Ok(sorted_unique(matches))
}
