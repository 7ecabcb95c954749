//! The interactive narrowing loop: show the matches, read one command, filter or
//! toggle, repeat until the user picks rows or gives up.

use anyhow::Result;
use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use std::io::{BufRead, Write};

use crate::filters::{filter_filename, filter_statement, NEGATION_MARKER};
use crate::gateway::LookupGateway;
use crate::highlight::{Emphasis, MarkedText, Painter};
use crate::matches::{sorted_unique, Match};
use crate::search::{find_matches, Query};

pub const A_KEEP_STATEMENT: &str = ";";
pub const A_CLEAN_STATEMENT: &str = "!;";
pub const A_FOLD: &str = ".";
pub const A_RESTART: char = '~';
pub const A_EXCLUDE: char = '!';

/// One line of user input, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Abort,
    /// Numeric selection such as `3`, `3,5` or `1-3, 7`.
    Select(String),
    KeepStatements,
    CleanStatements,
    ToggleFold,
    /// `~` alone re-runs the seed query; `~p1 p2 ~p3` starts over with new patterns.
    Restart(Option<Vec<String>>),
    IncludeFiles(String),
    ExcludeFiles(String),
}

impl Command {
    pub fn parse(input: &str) -> Command {
        let input = input.trim();
        if input.is_empty() {
            return Command::Abort;
        }
        if input.starts_with(|c: char| c.is_ascii_digit()) {
            return Command::Select(input.to_string());
        }
        if input == A_KEEP_STATEMENT {
            return Command::KeepStatements;
        }
        if input == A_CLEAN_STATEMENT {
            return Command::CleanStatements;
        }
        if input == A_FOLD {
            return Command::ToggleFold;
        }
        if let Some(rest) = input.strip_prefix(A_RESTART) {
            let patterns: Vec<String> = rest.split_whitespace().map(str::to_string).collect();
            return Command::Restart((!patterns.is_empty()).then_some(patterns));
        }
        if let Some(rest) = input.strip_prefix(A_EXCLUDE) {
            return Command::ExcludeFiles(rest.trim().to_string());
        }
        Command::IncludeFiles(input.to_string())
    }
}

/// Inclusive 1-based ranges; a single number `n` is `(n, n)`.
fn parse_ranges(text: &str) -> Option<Vec<(usize, usize)>> {
    let mut ranges = Vec::new();
    for token in text.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let range: (usize, usize) = match token.split_once('-') {
            Some((from, to)) => (from.trim().parse().ok()?, to.trim().parse().ok()?),
            None => {
                let n = token.parse().ok()?;
                (n, n)
            }
        };
        if range.0 > range.1 {
            return None;
        }
        ranges.push(range);
    }
    (!ranges.is_empty()).then_some(ranges)
}

/// `"3,5,7-10"` -> `[3, 5, 7, 8, 9, 10]`. Any malformed token rejects the whole input.
pub fn parse_numbers(text: &str) -> Option<Vec<usize>> {
    let mut ns: Vec<usize> = parse_ranges(text)?
        .into_iter()
        .flat_map(|(from, to)| from..=to)
        .collect();
    ns.sort_unstable();
    ns.dedup();
    Some(ns)
}

/// Parse `text` and check every index lies in `1..=count`.
pub fn parse_selection(text: &str, count: usize) -> Option<Vec<usize>> {
    let ranges = parse_ranges(text)?;
    if ranges.iter().any(|&(from, to)| from < 1 || to > count) {
        return None;
    }
    parse_numbers(text)
}

/// Rows actually shown: with `fold`, only the first match of every file.
pub fn visible_rows(matches: &[Match], fold: bool) -> Vec<&Match> {
    let mut rows: Vec<&Match> = Vec::with_capacity(matches.len());
    for m in matches {
        if fold && rows.last().is_some_and(|prev| prev.filename == m.filename) {
            continue;
        }
        rows.push(m);
    }
    rows
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// 1-based row numbers and the matches on those rows.
    Picked { indices: Vec<usize>, targets: Vec<Match> },
    /// Empty input, end of input, or nothing left to show.
    Aborted,
    /// Malformed or out-of-range numbers. The match set is unchanged and the
    /// next call reports the error below the redrawn list.
    Invalid,
}

#[derive(Debug, Clone)]
pub struct Outcome {
    pub selection: Selection,
    pub matches: Vec<Match>,
    pub patterns: Vec<String>,
}

fn prompt_help() -> String {
    format!(
        "\nSelect an action:\
         \n* Input number to select a file. Multiple choices are allowed (e.g., type \"1-3, 5\")\
         \n* Type \"{A_KEEP_STATEMENT}\" / \"{A_CLEAN_STATEMENT}\" to keep / remove statements.\
         \n* Type \"{A_FOLD}\" to switch between all matches and fold matches.\
         \n* Type STRING (regex) to filter filename. {A_EXCLUDE}STRING means exclude the matched filename.\
         \n* Type {A_RESTART}[PATTERN1 PATTERN2 {A_RESTART}PATTERN3 ...] to start over.\
         \n  Type only \"{A_RESTART}\" to use the patterns from the command line.\
         \n* Type ENTER to exit.\
         \n\
         \n>> "
    )
}

/// State of one interactive run. The fold toggle, the seed query and any
/// pending notice live here and survive every call to [`Session::filter_until_select`].
pub struct Session<'a> {
    gateway: &'a dyn LookupGateway,
    painter: &'a dyn Painter,
    seed: Query,
    fold: bool,
    clear_screen: bool,
    notice: Option<String>,
}

impl<'a> Session<'a> {
    pub fn new(gateway: &'a dyn LookupGateway, painter: &'a dyn Painter, seed: Query) -> Self {
        Self {
            gateway,
            painter,
            seed,
            fold: false,
            clear_screen: false,
            notice: None,
        }
    }

    pub fn with_clear_screen(mut self, clear_screen: bool) -> Self {
        self.clear_screen = clear_screen;
        self
    }

    #[cfg(test)]
    pub(crate) fn fold(&self) -> bool {
        self.fold
    }

    #[cfg(test)]
    pub(crate) fn seed(&self) -> &Query {
        &self.seed
    }

    /// Run the narrowing loop until the user selects rows, aborts, or types an
    /// invalid selection. `last_n` is the displayed row to mark as current.
    pub fn filter_until_select<R: BufRead, W: Write>(
        &mut self,
        mut matches: Vec<Match>,
        mut patterns: Vec<String>,
        last_n: Option<usize>,
        input: &mut R,
        out: &mut W,
    ) -> Result<Outcome> {
        loop {
            if matches.is_empty() {
                writeln!(out, "No file matched.")?;
                return Ok(Outcome {
                    selection: Selection::Aborted,
                    matches,
                    patterns,
                });
            }

            matches = sorted_unique(matches);
            self.show_list(&matches, &patterns, last_n, out)?;
            if let Some(msg) = self.notice.take() {
                writeln!(out, "\n{msg}")?;
            }
            write!(out, "{}", prompt_help())?;
            out.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                return Ok(Outcome {
                    selection: Selection::Aborted,
                    matches,
                    patterns,
                });
            }

            match Command::parse(&line) {
                Command::Abort => {
                    return Ok(Outcome {
                        selection: Selection::Aborted,
                        matches,
                        patterns,
                    })
                }
                Command::Select(text) => {
                    let selection = self.resolve_selection(&matches, &text);
                    if selection == Selection::Invalid {
                        self.notice = Some("Invalid input.".to_string());
                    }
                    return Ok(Outcome {
                        selection,
                        matches,
                        patterns,
                    });
                }
                Command::KeepStatements => matches = filter_statement(&matches, false),
                Command::CleanStatements => matches = filter_statement(&matches, true),
                Command::ToggleFold => self.fold = !self.fold,
                Command::Restart(new_patterns) => {
                    let query = match new_patterns {
                        Some(p) => Query::new(p),
                        None => self.seed.clone(),
                    };
                    match find_matches(self.gateway, &query) {
                        Ok(found) => {
                            matches = found;
                            patterns = query.patterns;
                        }
                        Err(e) => self.notice = Some(format!("Lookup failed: {e:#}")),
                    }
                }
                Command::IncludeFiles(pattern) => matches = filter_filename(&matches, &pattern, false),
                Command::ExcludeFiles(pattern) if pattern.is_empty() => {}
                Command::ExcludeFiles(pattern) => matches = filter_filename(&matches, &pattern, true),
            }
        }
    }

    fn resolve_selection(&self, matches: &[Match], text: &str) -> Selection {
        let rows = visible_rows(matches, self.fold);
        match parse_selection(text, rows.len()) {
            Some(indices) => {
                let targets = indices.iter().map(|&i| rows[i - 1].clone()).collect();
                Selection::Picked { indices, targets }
            }
            None => Selection::Invalid,
        }
    }

    fn show_list<W: Write>(
        &self,
        matches: &[Match],
        patterns: &[String],
        last_n: Option<usize>,
        out: &mut W,
    ) -> Result<()> {
        if self.clear_screen {
            queue!(out, Clear(ClearType::All), MoveTo(0, 0))?;
        }

        let highlighted: Vec<&str> = patterns
            .iter()
            .map(String::as_str)
            .filter(|p| !p.starts_with(NEGATION_MARKER))
            .collect();

        let mut last_filename: Option<&str> = None;
        let mut file_style = Emphasis::FileAlt;
        let mut ordinal = 0;
        for m in matches {
            let same_file = last_filename == Some(m.filename.as_str());
            if !same_file {
                file_style = match file_style {
                    Emphasis::File => Emphasis::FileAlt,
                    _ => Emphasis::File,
                };
            }
            if self.fold && same_file {
                continue;
            }
            last_filename = Some(m.filename.as_str());
            ordinal += 1;

            if last_n == Some(ordinal) {
                let row = format!("({ordinal:3}) {}:{}:{}", m.filename, m.line_num, m.text);
                writeln!(out, "{}", self.painter.paint(Emphasis::Current, &row))?;
                continue;
            }

            let code = highlighted
                .iter()
                .fold(MarkedText::plain(m.text.as_str()), |marked, p| marked.highlight(p, Emphasis::Primary));
            writeln!(
                out,
                "({}) {}:{}:{}",
                self.painter.paint(Emphasis::Index, &format!("{ordinal:3}")),
                self.painter.paint(file_style, &m.filename),
                self.painter.paint(Emphasis::LineNumber, &m.line_num.to_string()),
                code.render(self.painter)
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::{BrokenGateway, FakeGateway};
    use crate::highlight::testing::TagPainter;
    use crate::highlight::PlainPainter;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn m(filename: &str, line_num: usize, text: &str) -> Match {
        Match {
            filename: filename.to_string(),
            line_num,
            column: 0,
            text: text.to_string(),
        }
    }

    fn seed() -> Vec<Match> {
        vec![
            m("a.cpp", 10, "void Foo();"),
            m("a.cpp", 20, "void Foo() { return; }"),
            m("b.h", 5, "void Foo();"),
        ]
    }

    fn rows(ms: &[Match]) -> Vec<(&str, usize)> {
        ms.iter().map(|m| (m.filename.as_str(), m.line_num)).collect()
    }

    fn run(session: &mut Session<'_>, matches: Vec<Match>, script: &str) -> (Outcome, String) {
        run_with_last(session, matches, None, script)
    }

    fn run_with_last(
        session: &mut Session<'_>,
        matches: Vec<Match>,
        last_n: Option<usize>,
        script: &str,
    ) -> (Outcome, String) {
        let mut input = Cursor::new(script.as_bytes().to_vec());
        let mut out = Vec::new();
        let outcome = session
            .filter_until_select(matches, vec!["Foo".to_string()], last_n, &mut input, &mut out)
            .unwrap();
        (outcome, String::from_utf8(out).unwrap())
    }

    #[test]
    fn command_grammar() {
        assert_eq!(Command::parse(""), Command::Abort);
        assert_eq!(Command::parse("   \n"), Command::Abort);
        assert_eq!(Command::parse("3,5"), Command::Select("3,5".into()));
        assert_eq!(Command::parse(";"), Command::KeepStatements);
        assert_eq!(Command::parse("!;"), Command::CleanStatements);
        assert_eq!(Command::parse("."), Command::ToggleFold);
        assert_eq!(Command::parse("~"), Command::Restart(None));
        assert_eq!(
            Command::parse("~Foo Bar ~static"),
            Command::Restart(Some(vec!["Foo".into(), "Bar".into(), "~static".into()]))
        );
        assert_eq!(Command::parse("!test"), Command::ExcludeFiles("test".into()));
        assert_eq!(Command::parse(r"\.h$"), Command::IncludeFiles(r"\.h$".into()));
    }

    #[test]
    fn number_parsing() {
        assert_eq!(parse_numbers("3,5,7-10"), Some(vec![3, 5, 7, 8, 9, 10]));
        assert_eq!(parse_numbers("3, 5, 7-10"), Some(vec![3, 5, 7, 8, 9, 10]));
        assert_eq!(parse_numbers("1-1"), Some(vec![1]));
        assert_eq!(parse_numbers("5,3,3"), Some(vec![3, 5]));
        assert_eq!(parse_numbers("abc"), None);
        assert_eq!(parse_numbers("3-1"), None);
        assert_eq!(parse_numbers(""), None);
    }

    #[test]
    fn selection_bounds() {
        assert_eq!(parse_selection("0", 5), None);
        assert_eq!(parse_selection("6", 5), None);
        assert_eq!(parse_selection("4-6", 5), None);
        assert_eq!(parse_selection("1-3,5", 5), Some(vec![1, 2, 3, 5]));
        // Bounds are checked before any range is expanded.
        assert_eq!(parse_selection("1-18446744073709551615", 5), None);
    }

    #[test]
    fn statement_then_filename_filter() {
        let gw = FakeGateway::default();
        let mut session = Session::new(&gw, &PlainPainter, Query::new(["Foo"]));

        let (outcome, _) = run(&mut session, seed(), ";\n");
        assert_eq!(outcome.selection, Selection::Aborted);
        assert_eq!(rows(&outcome.matches), vec![("a.cpp", 10), ("b.h", 5)]);

        let (outcome, _) = run(&mut session, seed(), "\\.h$\n");
        assert_eq!(outcome.selection, Selection::Aborted);
        assert_eq!(rows(&outcome.matches), vec![("b.h", 5)]);

        let (outcome, _) = run(&mut session, seed(), "!\\.h$\n!;\n");
        assert_eq!(rows(&outcome.matches), vec![("a.cpp", 20)]);
    }

    #[test]
    fn numeric_selection_returns_rows() {
        let gw = FakeGateway::default();
        let mut session = Session::new(&gw, &PlainPainter, Query::new(["Foo"]));
        let (outcome, out) = run(&mut session, seed(), "1,3\n");
        match outcome.selection {
            Selection::Picked { indices, targets } => {
                assert_eq!(indices, vec![1, 3]);
                assert_eq!(rows(&targets), vec![("a.cpp", 10), ("b.h", 5)]);
            }
            other => panic!("unexpected selection: {other:?}"),
        }
        assert!(out.contains("(  1) a.cpp:10:void Foo();"));
        assert!(out.contains("(  3) b.h:5:void Foo();"));
        assert!(out.contains("Select an action:"));
    }

    #[test]
    fn invalid_selection_keeps_matches() {
        let gw = FakeGateway::default();
        let mut session = Session::new(&gw, &PlainPainter, Query::new(["Foo"]));
        let (outcome, _) = run(&mut session, seed(), "\\.cpp$\n7\n");
        assert_eq!(outcome.selection, Selection::Invalid);
        assert_eq!(rows(&outcome.matches), vec![("a.cpp", 10), ("a.cpp", 20)]);

        let (outcome, out) = run(&mut session, outcome.matches, "");
        assert_eq!(outcome.selection, Selection::Aborted);
        assert_eq!(out.matches("Invalid input.").count(), 1);
    }

    #[test]
    fn invalid_selection_survives_screen_clear() {
        let gw = FakeGateway::default();
        let mut session = Session::new(&gw, &PlainPainter, Query::new(["Foo"])).with_clear_screen(true);
        let one = vec![m("a.cpp", 10, "void Foo();")];

        let (outcome, _) = run(&mut session, one, "9\n");
        assert_eq!(outcome.selection, Selection::Invalid);

        let (_, out) = run(&mut session, outcome.matches, "");
        let after_clear = out.rsplit("\x1b[2J").next().unwrap();
        assert!(after_clear.contains("(  1) a.cpp:10:void Foo();"));
        assert!(after_clear.contains("Invalid input."));
    }

    #[test]
    fn fold_hides_rows_but_keeps_them_filterable() {
        let gw = FakeGateway::default();
        let mut session = Session::new(&gw, &PlainPainter, Query::new(["Foo"]));

        let (outcome, out) = run(&mut session, seed(), ".\n");
        assert!(session.fold());
        let last_render = out.rsplit("Select an action:").nth(1).unwrap();
        let last_render = last_render.rsplit(">> ").next().unwrap();
        assert!(last_render.contains("(  1) a.cpp:10:void Foo();"));
        assert!(last_render.contains("(  2) b.h:5:void Foo();"));
        assert!(!last_render.contains("a.cpp:20"));
        assert_eq!(outcome.matches.len(), 3);

        // Fold persists into the next call; row 2 is the header now.
        let (outcome, _) = run(&mut session, outcome.matches, "2\n");
        match outcome.selection {
            Selection::Picked { targets, .. } => assert_eq!(rows(&targets), vec![("b.h", 5)]),
            other => panic!("unexpected selection: {other:?}"),
        }

        // Filtering still sees the hidden row.
        let (outcome, _) = run(&mut session, seed(), "!;\n");
        assert_eq!(rows(&outcome.matches), vec![("a.cpp", 20)]);
    }

    #[test]
    fn empty_set_reports_no_match() {
        let gw = FakeGateway::default();
        let mut session = Session::new(&gw, &PlainPainter, Query::new(["Foo"]));
        let (outcome, out) = run(&mut session, seed(), "nothing-matches-this\n");
        assert_eq!(outcome.selection, Selection::Aborted);
        assert!(outcome.matches.is_empty());
        assert!(out.ends_with("No file matched.\n"));
    }

    #[test]
    fn end_of_input_aborts() {
        let gw = FakeGateway::default();
        let mut session = Session::new(&gw, &PlainPainter, Query::new(["Foo"]));
        let (outcome, _) = run(&mut session, seed(), "");
        assert_eq!(outcome.selection, Selection::Aborted);
        assert_eq!(outcome.matches.len(), 3);
    }

    #[test]
    fn restart_with_seed_and_new_patterns() {
        let gw = FakeGateway::default()
            .with_lookup("Foo", &["x.cc:1:Foo a;", "x.cc:2:static Foo b;"])
            .with_lookup("Bar", &["y.cc:9:Bar c;", "y.cc:10:static Bar d;"]);
        let mut session = Session::new(&gw, &PlainPainter, Query::new(["Foo"]));

        let (outcome, _) = run(&mut session, seed(), "~\n");
        assert_eq!(rows(&outcome.matches), vec![("x.cc", 1), ("x.cc", 2)]);
        assert_eq!(outcome.patterns, vec!["Foo".to_string()]);

        let (outcome, _) = run(&mut session, seed(), "~Bar ~static\n");
        assert_eq!(rows(&outcome.matches), vec![("y.cc", 9)]);
        assert_eq!(outcome.patterns, vec!["Bar".to_string(), "~static".to_string()]);
        assert_eq!(session.seed(), &Query::new(["Foo"]));
    }

    #[test]
    fn failed_restart_leaves_matches_alone() {
        let gw = BrokenGateway;
        let mut session = Session::new(&gw, &PlainPainter, Query::new(["Foo"]));
        let (outcome, out) = run(&mut session, seed(), "~\n");
        assert_eq!(outcome.matches.len(), 3);
        assert!(out.contains("Lookup failed: gid: command not found"));
    }

    #[test]
    fn last_row_and_patterns_are_emphasized() {
        let gw = FakeGateway::default();
        let mut session = Session::new(&gw, &TagPainter, Query::new(["Foo"]));
        let (_, out) = run_with_last(&mut session, seed(), Some(2), "");
        assert!(out.contains("<C>(  2) a.cpp:20:void Foo() { return; }</C>"));
        assert!(out.contains("(<I>  1</I>) <F>a.cpp</F>:<L>10</L>:void <P>Foo</P>();"));
        assert!(out.contains("(<I>  3</I>) <f>b.h</f>:<L>5</L>:void <P>Foo</P>();"));
    }

    #[test]
    fn duplicates_are_shown_once() {
        let gw = FakeGateway::default();
        let mut session = Session::new(&gw, &PlainPainter, Query::new(["Foo"]));
        let mut input = seed();
        input.push(m("b.h", 5, "void Foo();"));
        let (outcome, out) = run(&mut session, input, "");
        assert_eq!(outcome.matches.len(), 3);
        assert_eq!(out.matches("b.h:5").count(), 1);
    }
}
