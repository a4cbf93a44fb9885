use std::{fmt, path::PathBuf};

/// Position of a problem inside the fragment handed to a minifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

/// A problem reported by one of the minifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub location: Option<Location>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
        }
    }

    pub fn with_location(mut self, line: u32, column: u32) -> Self {
        self.location = Some(Location { line, column });
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(Location { line, column }) => {
                write!(f, "{} (line {line}, column {column})", self.message)
            }
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for Diagnostic {}

/// Which step of the pipeline produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Document,
    Script,
    Style,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Document => "document",
            Self::Script => "script",
            Self::Style => "style",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid setup, aborts the whole run
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A minifier rejected a document or one of its inline fragments
    #[error("{stage} minification failed: {diagnostic}")]
    Grammar { stage: Stage, diagnostic: Diagnostic },

    /// A worker processing one file died before reporting back
    #[error("worker failed: {0}")]
    Worker(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn grammar(stage: Stage, diagnostic: Diagnostic) -> Self {
        Self::Grammar { stage, diagnostic }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The pipeline stage this error came from, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Grammar { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
