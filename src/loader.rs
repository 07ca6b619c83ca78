use std::{collections::HashMap, io};

use thiserror::Error;

use crate::assembler::lexer::{SourceLine, SourceUnit};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Unable to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("{file}:{line}: error: Unable to include '{path}': {source}")]
    Include {
        file: String,
        line: usize,
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("{file}:{line}: error: Malformed include, expected #include \"<file>\"")]
    MalformedInclude { file: String, line: usize },
}

/// Where the loader gets file contents from.
pub trait SourceReader {
    fn read(&self, path: &str) -> io::Result<String>;
}

/// Reads from the file system. Relative paths are relative to the working directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskReader;

impl SourceReader for DiskReader {
    fn read(&self, path: &str) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Serves files from memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryReader {
    files: HashMap<String, String>,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, text: &str) -> Self {
        self.files.insert(path.to_owned(), text.to_owned());
        self
    }
}

impl SourceReader for MemoryReader {
    fn read(&self, path: &str) -> io::Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }
}

const INCLUDE: &str = "#include";

/// Remove `//` and `/* */` comments from `line`. `in_comment` carries an open block comment over
/// to the next line.
fn strip_comments(line: &str, in_comment: &mut bool) -> String {
    let mut stripped = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        let next = chars.peek().copied();
        if *in_comment {
            if ch == '*' && next == Some('/') {
                chars.next();
                *in_comment = false;
            }
            continue;
        }

        match (ch, next) {
            ('/', Some('/')) => break,
            ('/', Some('*')) => {
                chars.next();
                *in_comment = true;
                // Keep `a/* */b` two words
                stripped.push(' ');
            }
            _ => stripped.push(ch),
        }
    }

    stripped
}

/// Collapse every run of spaces and tabs into one space and trim both ends.
fn normalize_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// `"path"` following an `#include`.
fn include_path(rest: &str) -> Option<&str> {
    let quoted = rest.trim().strip_prefix('"')?;
    let end = quoted.find('"')?;
    Some(&quoted[..end]).filter(|path| !path.is_empty())
}

/// Reads a source file and everything it includes into one [`SourceUnit`].
///
/// Comments and redundant whitespace are removed and empty lines dropped. Line numbers keep
/// pointing into the original files. An `#include "file"` line is replaced by the lines of that
/// file. A file is only loaded once, later includes of it are skipped.
pub struct Loader<R: SourceReader> {
    reader: R,
    unit: SourceUnit,
}

impl<R: SourceReader> Loader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            unit: SourceUnit::new(),
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn load(mut self, path: &str) -> Result<SourceUnit, LoaderError> {
        tracing::info!("Loading...");
        let text = self.reader.read(path).map_err(|source| LoaderError::Io {
            path: path.to_owned(),
            source,
        })?;
        self.load_text(path, &text)?;
        tracing::info!(
            "Loading... done ({} lines from {} file(s))",
            self.unit.lines.len(),
            self.unit.files.len()
        );

        Ok(self.unit)
    }

    fn load_text(&mut self, path: &str, text: &str) -> Result<(), LoaderError> {
        let source = self.unit.add_file(path);
        tracing::debug!("Loaded {} as source {}", path, source);

        let mut in_comment = false;
        for (ix, raw) in text.lines().enumerate() {
            let line_number = ix + 1;
            let line = normalize_whitespace(&strip_comments(raw, &mut in_comment));
            if line.is_empty() {
                continue;
            }

            if let Some(rest) = line.strip_prefix(INCLUDE) {
                let included = include_path(rest).ok_or_else(|| LoaderError::MalformedInclude {
                    file: path.to_owned(),
                    line: line_number,
                })?;
                self.include(path, line_number, included)?;
                continue;
            }

            self.unit
                .lines
                .push(SourceLine::new(source, line_number, &line));
        }

        Ok(())
    }

    fn include(&mut self, file: &str, line: usize, path: &str) -> Result<(), LoaderError> {
        if self.unit.find_file(path).is_some() {
            tracing::debug!("{}:{}: {} already loaded, skipping", file, line, path);
            return Ok(());
        }

        let text = self.reader.read(path).map_err(|source| LoaderError::Include {
            file: file.to_owned(),
            line,
            path: path.to_owned(),
            source,
        })?;
        self.load_text(path, &text)
    }
}
