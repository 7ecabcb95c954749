//! Emphasis spans over plain text, rendered through a pluggable [`Painter`].

use owo_colors::OwoColorize;
use regex::RegexBuilder;

/// Every emphasis style the navigator draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Emphasis {
    /// Occurrence of the active search pattern.
    Primary,
    /// Occurrence of a secondary (path) pattern.
    Secondary,
    /// Row number in the match list.
    Index,
    /// Filename; alternates with [`Emphasis::FileAlt`] whenever the file changes.
    File,
    FileAlt,
    LineNumber,
    /// The whole row of the previously selected entry.
    Current,
}

/// Rendering backend for emphasis. The core never emits terminal codes itself.
pub trait Painter {
    fn paint(&self, style: Emphasis, text: &str) -> String;
}

/// ANSI colors.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnsiPainter;

impl Painter for AnsiPainter {
    fn paint(&self, style: Emphasis, text: &str) -> String {
        match style {
            Emphasis::Primary | Emphasis::Index => text.red().bold().to_string(),
            Emphasis::Secondary | Emphasis::File => text.green().bold().to_string(),
            Emphasis::FileAlt => text.green().to_string(),
            Emphasis::LineNumber => text.yellow().bold().to_string(),
            Emphasis::Current => text.blue().bold().to_string(),
        }
    }
}

/// No emphasis at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainPainter;

impl Painter for PlainPainter {
    fn paint(&self, _style: Emphasis, text: &str) -> String {
        text.to_string()
    }
}

pub fn painter_for(color: bool) -> Box<dyn Painter> {
    if color {
        Box::new(AnsiPainter)
    } else {
        Box::new(PlainPainter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub style: Emphasis,
}

/// Plain text plus non-overlapping emphasis spans (byte ranges into `text`).
///
/// Spans are always computed against the plain text, so highlighting the same
/// pattern twice never nests emphasis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedText {
    text: String,
    spans: Vec<Span>,
}

impl MarkedText {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            spans: Vec::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Emphasize every case-insensitive occurrence of `pattern`, scanning left to
    /// right without overlap. Occurrences touching an existing span are left alone.
    pub fn highlight(mut self, pattern: &str, style: Emphasis) -> Self {
        if pattern.is_empty() {
            return self;
        }

        // Matching runs on the original text, so span offsets stay valid byte ranges.
        let Ok(re) = RegexBuilder::new(&regex::escape(pattern))
            .case_insensitive(true)
            .build()
        else {
            return self;
        };

        for found in re.find_iter(&self.text) {
            let (start, end) = (found.start(), found.end());
            let taken = self.spans.iter().any(|s| start < s.end && s.start < end);
            if !taken {
                self.spans.push(Span { start, end, style });
            }
        }

        self.spans.sort_by_key(|s| s.start);
        self
    }

    pub fn render(&self, painter: &dyn Painter) -> String {
        let mut out = String::with_capacity(self.text.len());
        let mut last_end = 0;
        for span in &self.spans {
            out.push_str(&self.text[last_end..span.start]);
            out.push_str(&painter.paint(span.style, &self.text[span.start..span.end]));
            last_end = span.end;
        }
        out.push_str(&self.text[last_end..]);
        out
    }
}

/// Emphasize every case-insensitive occurrence of `pattern` in `text`.
pub fn highlight(pattern: &str, text: &str, style: Emphasis) -> MarkedText {
    MarkedText::plain(text).highlight(pattern, style)
}
