use std::fmt;

/// Classification of a preprocessing failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The source text could not be parsed at all.
    Parse,
    /// Reading a file failed.
    Io,
    /// A directive argument has the wrong shape (e.g. `.exposes` not a list).
    Structure,
    /// A referenced file, binding, or exposed item does not exist.
    Resolution,
    /// A directive argument is missing a required option.
    Validation,
    /// A dotted key that no handler recognizes.
    UnknownDirective,
    /// An import chain that revisits a file already being resolved.
    CircularImport,
}

/// The single error type raised by the evaluation engine.
///
/// Carries a message and, where the failure is tied to a specific mapping
/// entry, the 1-based source line of that entry. The `Line N` phrasing
/// appears only in the `Display` output.
#[derive(Debug, Clone, PartialEq)]
pub struct YamlppError {
    pub kind: ErrorKind,
    pub message: String,
    pub line: Option<usize>,
}

impl YamlppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            line: None,
        }
    }

    pub fn with_line(mut self, line: Option<usize>) -> Self {
        self.line = line;
        self
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn structure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Structure, message)
    }

    pub fn resolution(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Resolution, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn unknown_directive(key: &str) -> Self {
        Self::new(
            ErrorKind::UnknownDirective,
            format!("unknown directive '{key}'"),
        )
    }

    pub fn circular_import(path: impl AsRef<std::path::Path>) -> Self {
        Self::new(
            ErrorKind::CircularImport,
            format!("circular import of '{}'", path.as_ref().display()),
        )
    }
}

impl fmt::Display for YamlppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(line) = self.line {
            write!(f, " at Line {line}")?;
        }
        Ok(())
    }
}

impl std::error::Error for YamlppError {}

pub type Result<T> = std::result::Result<T, YamlppError>;
