use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::fmt;

/// Source span as ghci reports it.
///
/// Ghci counts lines and columns from 1 and reports an end column one less than
/// editors expect. The raw values are kept for display, consumers read the
/// normalized (zero based lines, exclusive end column) ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    file_path: String,
    raw_start_line: i32,
    raw_start_symbol: i32,
    raw_end_line: i32,
    raw_end_symbol: i32,
}

impl Position {
    pub fn new(
        file_path: impl Into<String>,
        raw_start_line: i32,
        raw_start_symbol: i32,
        raw_end_line: i32,
        raw_end_symbol: i32,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            raw_start_line,
            raw_start_symbol,
            raw_end_line,
            raw_end_symbol,
        }
    }

    /// Parse a span in one of the layouts ghci prints:
    /// `A.hs:3:5`, `A.hs:3:5-9` or `A.hs:(3,5)-(5,2)`.
    pub fn parse(span: &str) -> Option<Self> {
        static MULTI_LINE_RE: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"^(.+):\((\d+),(\d+)\)-\((\d+),(\d+)\)$").expect("must compile")
        });
        static SINGLE_LINE_RE: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"^(.+):(\d+):(\d+)(?:-(\d+))?$").expect("must compile")
        });

        let span = span.trim();
        if let Some(caps) = MULTI_LINE_RE.captures(span) {
            let number = |i: usize| caps.get(i)?.as_str().parse::<i32>().ok();
            return Some(Self::new(
                caps.get(1)?.as_str(),
                number(2)?,
                number(3)?,
                number(4)?,
                number(5)?,
            ));
        }

        let caps = SINGLE_LINE_RE.captures(span)?;
        let number = |i: usize| caps.get(i)?.as_str().parse::<i32>().ok();
        let line = number(2)?;
        let start = number(3)?;
        let end = match caps.get(4) {
            Some(end) => end.as_str().parse::<i32>().ok()?,
            None => start,
        };
        Some(Self::new(caps.get(1)?.as_str(), line, start, line, end))
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    /// Zero based start line.
    pub fn normalized_start_line(&self) -> i32 {
        self.raw_start_line.saturating_sub(1)
    }

    pub fn normalized_start_symbol(&self) -> i32 {
        self.raw_start_symbol
    }

    /// Zero based end line.
    pub fn normalized_end_line(&self) -> i32 {
        self.raw_end_line.saturating_sub(1)
    }

    /// End column corrected to the editor convention.
    pub fn normalized_end_symbol(&self) -> i32 {
        self.raw_end_symbol.saturating_add(1)
    }

    #[cfg(test)]
    fn raw_start(&self) -> (i32, i32) {
        (self.raw_start_line, self.raw_start_symbol)
    }

    #[cfg(test)]
    fn raw_end(&self) -> (i32, i32) {
        (self.raw_end_line, self.raw_end_symbol)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = &self.file_path;
        if self.raw_start_line == self.raw_end_line {
            if self.raw_start_symbol == self.raw_end_symbol {
                write!(f, "{path}:{}:{}", self.raw_start_line, self.raw_start_symbol)
            } else {
                write!(
                    f,
                    "{path}:{}:{}-{}",
                    self.raw_start_line, self.raw_start_symbol, self.raw_end_symbol
                )
            }
        } else {
            write!(
                f,
                "{path}:({},{})-({},{})",
                self.raw_start_line, self.raw_start_symbol, self.raw_end_line, self.raw_end_symbol
            )
        }
    }
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Position", 5)?;
        state.serialize_field("file", &self.file_path)?;
        state.serialize_field("startLine", &self.normalized_start_line())?;
        state.serialize_field("startColumn", &self.normalized_start_symbol())?;
        state.serialize_field("endLine", &self.normalized_end_line())?;
        state.serialize_field("endColumn", &self.normalized_end_symbol())?;
        state.end()
    }
}
