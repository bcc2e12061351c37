use std::{fmt, path::PathBuf};

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Result type for quill operations (boxed to reduce size on stack)
pub type Result<T> = std::result::Result<T, Box<Error>>;

/// Lifecycle of one compilation pass.
///
/// ```text
/// Open ──finish()──▶ Finalizing ──▶ Closed ──finish()──▶ Finalizing ──▶ Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassState {
    /// Registrations are accepted.
    #[default]
    Open,
    /// A snapshot has been taken and descriptors are being written.
    Finalizing,
    /// `finish()` completed; further registrations are a caller error.
    Closed,
}

impl PassState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassState::Open => "open",
            PassState::Finalizing => "finalizing",
            PassState::Closed => "closed",
        }
    }
}

impl fmt::Display for PassState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("invalid {kind} '{value}': {reason}")]
    #[diagnostic(
        code(quill::invalid_identifier),
        help("use non-empty segments without '..', path separators or whitespace")
    )]
    InvalidIdentifier {
        kind: &'static str,
        value: String,
        reason: String,
    },

    #[error("destination '{path}' is unavailable")]
    #[diagnostic(
        code(quill::destination_unavailable),
        help("check that the output directory is writable and the disk is not full")
    )]
    DestinationUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "failed to write {} service descriptor(s): {}",
        .service_types.len(),
        .service_types.join(", ")
    )]
    #[diagnostic(code(quill::aggregated_write_failure))]
    AggregatedWriteFailure {
        service_types: Vec<String>,
        #[related]
        failures: Vec<Error>,
        /// Service types whose descriptor was still written.
        written: Vec<String>,
        /// Service types skipped because `META-INF` files are unsupported.
        skipped: Vec<String>,
    },

    #[error("cannot {operation} while the pass is {state}")]
    #[diagnostic(
        code(quill::invalid_state),
        help("register service entries before calling finish()")
    )]
    InvalidState {
        operation: &'static str,
        state: PassState,
    },

    #[error("failed to read '{path}'")]
    #[diagnostic(code(quill::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {filename}")]
    #[diagnostic(code(quill::parse_error))]
    Parse {
        filename: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("parse error here")]
        span: Option<SourceSpan>,
        #[source]
        source: toml::de::Error,
    },

    #[error("{message}")]
    #[diagnostic(code(quill::validation_error))]
    Validation {
        #[source_code]
        src: NamedSource<String>,
        message: String,
    },
}

impl Error {
    /// Create an invalid identifier error
    pub fn invalid_identifier(
        kind: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Box<Self> {
        Box::new(Error::InvalidIdentifier {
            kind,
            value: value.into(),
            reason: reason.into(),
        })
    }

    /// Create a destination error for the given path
    pub fn destination_unavailable(path: impl Into<PathBuf>, source: std::io::Error) -> Box<Self> {
        Box::new(Error::DestinationUnavailable {
            path: path.into(),
            source,
        })
    }

    /// Create an invalid state error
    pub fn invalid_state(operation: &'static str, state: PassState) -> Box<Self> {
        Box::new(Error::InvalidState { operation, state })
    }

    /// Create a parse error from a toml error with source context
    pub fn parse(source: toml::de::Error, src: &str, filename: &str) -> Box<Self> {
        let span = source.span().map(SourceSpan::from);
        Box::new(Error::Parse {
            filename: filename.to_string(),
            src: NamedSource::new(filename, src.to_string()),
            span,
            source,
        })
    }

    /// Create a validation error with source context
    pub fn validation(message: impl Into<String>, src: &str, filename: &str) -> Box<Self> {
        Box::new(Error::Validation {
            src: NamedSource::new(filename, src.to_string()),
            message: message.into(),
        })
    }

    /// Service types named by an aggregated failure, empty for other variants.
    pub fn failed_service_types(&self) -> &[String] {
        match self {
            Error::AggregatedWriteFailure { service_types, .. } => service_types,
            _ => &[],
        }
    }
}
