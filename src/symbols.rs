//! Symbol-reference listing: wrap long `lid` rows and highlight the symbol and path.

use anyhow::Result;

use crate::gateway::LookupGateway;
use crate::highlight::{Emphasis, MarkedText};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub max_width: usize,
    pub indent: usize,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            max_width: 120,
            indent: 8,
        }
    }
}

fn width(s: &str) -> usize {
    s.chars().count()
}

fn flush_row(row: &mut Vec<&str>, rows: &mut Vec<String>, pad: &str) {
    let prefix = if rows.is_empty() { "" } else { pad };
    rows.push(format!("{prefix}{}", row.join(" ")));
    row.clear();
}

/// Greedy word wrap. Continuation rows start with `layout.indent` spaces.
/// Tokens after the first are dropped when they do not contain `path_pattern`.
fn wrap_tokens(tokens: &[&str], path_pattern: Option<&str>, layout: Layout) -> Vec<String> {
    let pad = " ".repeat(layout.indent);
    let mut rows = Vec::new();
    let mut row: Vec<&str> = Vec::new();
    let mut row_width = 0;

    for (i, tk) in tokens.iter().copied().enumerate() {
        if i > 0 && path_pattern.is_some_and(|p| !tk.contains(p)) {
            continue;
        }

        let sep = usize::from(!row.is_empty());
        if !row.is_empty() && row_width + sep + width(tk) > layout.max_width {
            flush_row(&mut row, &mut rows, &pad);
            row_width = layout.indent;
        }

        let sep = usize::from(!row.is_empty());
        row_width += sep + width(tk);
        row.push(tk);
    }

    if !row.is_empty() {
        flush_row(&mut row, &mut rows, &pad);
    }
    rows
}

/// Lay out raw reference rows (`SYMBOL path path ...`) for display.
///
/// With a `path_pattern`, rows whose paths never mention it are skipped and the
/// pattern gets a secondary highlight. Rows narrower than `layout.max_width`
/// pass through untouched.
pub fn format_symbol_lines(
    lines: &[String],
    pattern: &str,
    path_pattern: Option<&str>,
    layout: Layout,
) -> Vec<MarkedText> {
    let path_pattern = path_pattern.filter(|p| !p.is_empty());
    let mut rows = Vec::new();

    for line in lines {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if let Some(pp) = path_pattern {
            if !tokens.iter().skip(1).any(|p| p.contains(pp)) {
                continue;
            }
        }

        if width(line) < layout.max_width {
            rows.push(line.clone());
            continue;
        }

        rows.extend(wrap_tokens(&tokens, path_pattern, layout));
    }

    rows.into_iter()
        .filter(|row| !row.is_empty())
        .map(|row| {
            let marked = MarkedText::plain(row).highlight(pattern, Emphasis::Primary);
            match path_pattern {
                Some(pp) => marked.highlight(pp, Emphasis::Secondary),
                None => marked,
            }
        })
        .collect()
}

/// Query the gateway for references to `pattern` and format them.
///
/// A path pattern implies verbose output, since it needs the file lists.
pub fn find_symbols(
    gateway: &dyn LookupGateway,
    pattern: &str,
    verbose: bool,
    path_pattern: Option<&str>,
    layout: Layout,
) -> Result<Vec<MarkedText>> {
    let verbose = verbose || path_pattern.is_some_and(|p| !p.is_empty());
    let lines = gateway.symbol_references(pattern, verbose)?;
    Ok(format_symbol_lines(&lines, pattern, path_pattern, layout))
}
