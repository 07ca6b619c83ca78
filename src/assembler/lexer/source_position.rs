use std::fmt;

/// Column range inside a single source line, `start` inclusive and `end` exclusive.
///
/// Columns are byte offsets. Sources are ASCII, so they double as character columns.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn at(column: usize) -> Self {
        Self::new(column, column)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// One cleaned-up line of source text and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// Index into [`SourceUnit::files`]
    pub source: usize,
    /// 1-based line number in the original file
    pub line: usize,
    pub text: String,
}

impl SourceLine {
    pub fn new(source: usize, line: usize, text: &str) -> Self {
        Self {
            source,
            line,
            text: text.to_owned(),
        }
    }
}

/// The flattened program: every loaded file name and all lines in processing order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceUnit {
    pub files: Vec<String>,
    pub lines: Vec<SourceLine>,
}

impl SourceUnit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a unit from a single in-memory text, keeping every line as is.
    pub fn from_text(name: &str, text: &str) -> Self {
        let mut unit = Self::new();
        let source = unit.add_file(name);
        unit.lines = text
            .lines()
            .enumerate()
            .map(|(ix, line)| SourceLine::new(source, ix + 1, line))
            .collect();
        unit
    }

    /// Register a file name and return its source id.
    pub fn add_file(&mut self, name: &str) -> usize {
        self.files.push(name.to_owned());
        self.files.len() - 1
    }

    pub fn find_file(&self, name: &str) -> Option<usize> {
        self.files.iter().position(|file| file == name)
    }

    pub fn source_name(&self, source: usize) -> &str {
        self.files
            .get(source)
            .map(String::as_str)
            .unwrap_or("<unknown>")
    }
}
