//! Error taxonomy for a generation pass
//!
//! Every variant aborts the current pass; no partial output is ever produced.

use std::{fmt, io, path::PathBuf};

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid base directory {}: {reason}", path.display())]
    Configuration { path: PathBuf, reason: String },

    #[error("failed to read config file {}", path.display())]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file {}: {message}", path.display())]
    ConfigSyntax { path: PathBuf, message: String },

    #[error("invalid glob pattern `{pattern}`: {reason}")]
    Discovery { pattern: String, reason: String },

    #[error("failed to walk route directory")]
    Walk {
        #[from]
        source: walkdir::Error,
    },

    #[error("failed to read route file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("alias `{alias}` generated for both {first} and {second}")]
    Emission {
        alias: String,
        first: String,
        second: String,
    },

    #[error("cannot express {} as a file URL", path.display())]
    Specifier { path: PathBuf },
}

/// A route file whose content is not a valid module
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ParseError {
    pub path: PathBuf,
    pub line: usize,
    pub column: usize,
    pub rule: String,
}

impl ParseError {
    pub fn new(path: impl Into<PathBuf>, line: usize, column: usize, rule: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            line,
            column,
            rule: rule.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}",
            self.path.display(),
            self.line,
            self.column,
            self.rule
        )
    }
}
