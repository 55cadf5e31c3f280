//! Parse Utilities
//!
//! Source files, locations and spans attached to template nodes, plus the
//! user-facing `ParseError` collected while compiling a template.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParseSourceFile {
    pub content: String,
    pub url: String,
}

impl ParseSourceFile {
    pub fn new(content: impl Into<String>, url: impl Into<String>) -> Self {
        ParseSourceFile {
            content: content.into(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseLocation {
    pub file: Arc<ParseSourceFile>,
    pub offset: usize,
    pub line: usize,
    pub col: usize,
}

impl ParseLocation {
    pub fn new(file: Arc<ParseSourceFile>, offset: usize, line: usize, col: usize) -> Self {
        ParseLocation {
            file,
            offset,
            line,
            col,
        }
    }

    /// Returns a new location `delta` characters away, tracking line and column changes.
    pub fn move_by(&self, delta: i32) -> ParseLocation {
        let source = self.file.content.as_bytes();
        let mut offset = self.offset.min(source.len());
        let mut line = self.line;
        let mut col = self.col;
        let mut delta = delta;

        while offset > 0 && delta < 0 {
            offset -= 1;
            delta += 1;
            if source[offset] == b'\n' {
                line = line.saturating_sub(1);
                col = match self.file.content[..offset].rfind('\n') {
                    Some(prior_line) => offset - prior_line,
                    None => offset,
                };
            } else {
                col = col.saturating_sub(1);
            }
        }

        while offset < source.len() && delta > 0 {
            let ch = source[offset];
            offset += 1;
            delta -= 1;
            if ch == b'\n' {
                line += 1;
                col = 0;
            } else {
                col += 1;
            }
        }

        ParseLocation::new(self.file.clone(), offset, line, col)
    }
}

impl fmt::Display for ParseLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.file.url, self.line, self.col)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseSourceSpan {
    pub start: ParseLocation,
    pub end: ParseLocation,
    pub details: Option<String>,
}

impl ParseSourceSpan {
    pub fn new(start: ParseLocation, end: ParseLocation) -> Self {
        ParseSourceSpan {
            start,
            end,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Creates a span covering `start..end` byte offsets of `file`, computing line/col.
    pub fn from_offsets(file: &Arc<ParseSourceFile>, start: usize, end: usize) -> Self {
        let origin = ParseLocation::new(file.clone(), 0, 0, 0);
        let start_loc = origin.move_by(start as i32);
        let end_loc = start_loc.move_by(end.saturating_sub(start) as i32);
        ParseSourceSpan::new(start_loc, end_loc)
    }

    /// The source text covered by this span.
    pub fn text(&self) -> &str {
        let content = &self.start.file.content;
        let end = self.end.offset.min(content.len());
        let start = self.start.offset.min(end);
        &content[start..end]
    }
}

impl fmt::Display for ParseSourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseErrorLevel {
    Warning,
    Error,
}

/// A problem in the user's template. Collected on the compilation job; never aborts a compile.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{msg} ({span})")]
pub struct ParseError {
    pub span: ParseSourceSpan,
    pub msg: String,
    pub level: ParseErrorLevel,
}

impl ParseError {
    pub fn new(span: ParseSourceSpan, msg: impl Into<String>) -> Self {
        ParseError {
            span,
            msg: msg.into(),
            level: ParseErrorLevel::Error,
        }
    }

    pub fn warning(span: ParseSourceSpan, msg: impl Into<String>) -> Self {
        ParseError {
            span,
            msg: msg.into(),
            level: ParseErrorLevel::Warning,
        }
    }
}

static NON_IDENTIFIER_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_$]").expect("valid identifier regex"));

/// Replaces characters that cannot appear in a generated identifier with underscores.
pub fn sanitize_identifier(name: &str) -> String {
    let sanitized = NON_IDENTIFIER_CHARS.replace_all(name, "_");
    match sanitized.chars().next() {
        Some(c) if c.is_ascii_digit() => format!("_{}", sanitized),
        _ => sanitized.into_owned(),
    }
}
