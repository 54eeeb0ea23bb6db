//! Error taxonomy for the resolver/runtime core.
//!
//! Every failure in this crate is one variant of [`Error`], each carrying a
//! fixed `code` (the `ENOTFOUND` / `EFETCH` / ... family) plus whatever
//! context is known at the point of failure. The enum is the tagged sum type
//! called for by the redesign notes: callers match on `code()` instead of
//! `instanceof`-style downcasting.

use serde::Serialize;
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Stable error discriminant, serialized verbatim across the error transport
/// boundary described for the (out-of-scope) JSON-RPC surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    ENOTFOUND,
    EFETCH,
    EINSTALL,
    EEXEC,
    ESECURITY,
    EVALIDATION,
    ETIMEOUT,
    ERESOLUTION,
    ETARBALL,
    EPARSE,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Structured context attached to an error, mirroring §6's
/// `context ⊆ { package, version, registry, path, cause }`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ErrorContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl ErrorContext {
    pub fn with_package(mut self, name: impl Into<String>) -> Self {
        self.package = Some(name.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("package not found: {0}")]
    NotFound(String),

    #[error("fetch failed: {message}")]
    Fetch {
        message: String,
        status: Option<u16>,
        context: ErrorContext,
    },

    #[error("install failed: {0}")]
    Install(String),

    #[error("execution failed: {0}")]
    Exec(String),

    #[error("security violation ({violation}): {package}")]
    Security { package: String, violation: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("dependency resolution failed: {message}")]
    Resolution {
        message: String,
        context: ErrorContext,
    },

    #[error("tarball error: {0}")]
    Tarball(String),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Serializable wire form of an [`Error`], matching §6's error transport:
/// `{ name, code, message, context?, stack? }`.
#[derive(Debug, Serialize)]
pub struct WireError {
    pub name: &'static str,
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::NotFound(_) => ErrorCode::ENOTFOUND,
            Error::Fetch { .. } => ErrorCode::EFETCH,
            Error::Install(_) => ErrorCode::EINSTALL,
            Error::Exec(_) => ErrorCode::EEXEC,
            Error::Security { .. } => ErrorCode::ESECURITY,
            Error::Validation(_) => ErrorCode::EVALIDATION,
            Error::Timeout { .. } => ErrorCode::ETIMEOUT,
            Error::Resolution { .. } => ErrorCode::ERESOLUTION,
            Error::Tarball(_) => ErrorCode::ETARBALL,
            Error::Parse(_) => ErrorCode::EPARSE,
        }
    }

    pub fn has_code(&self, code: ErrorCode) -> bool {
        self.code() == code
    }

    pub fn to_wire(&self) -> WireError {
        let context = match self {
            Error::Fetch { context, .. } => Some(context.clone()),
            Error::Resolution { context, .. } => Some(context.clone()),
            _ => None,
        };
        WireError {
            name: "NpmxError",
            code: self.code(),
            message: self.to_string(),
            context,
        }
    }

    pub fn fetch(message: impl Into<String>, status: Option<u16>) -> Self {
        Error::Fetch {
            message: message.into(),
            status,
            context: ErrorContext::default(),
        }
    }

    pub fn resolution(message: impl Into<String>, context: ErrorContext) -> Self {
        Error::Resolution {
            message: message.into(),
            context,
        }
    }

    /// Coerces an arbitrary error into the taxonomy, defaulting to
    /// `EVALIDATION` and preserving the original message as `context.cause`.
    pub fn wrap(err: impl std::fmt::Display, code: ErrorCode) -> Self {
        let cause = err.to_string();
        match code {
            ErrorCode::ENOTFOUND => Error::NotFound(cause),
            ErrorCode::EFETCH => Error::fetch(cause, None),
            ErrorCode::EINSTALL => Error::Install(cause),
            ErrorCode::EEXEC => Error::Exec(cause),
            ErrorCode::ETIMEOUT => Error::Timeout { ms: 0 },
            ErrorCode::ERESOLUTION => Error::resolution(cause, ErrorContext::default()),
            ErrorCode::ETARBALL => Error::Tarball(cause),
            ErrorCode::EPARSE => Error::Parse(cause),
            ErrorCode::ESECURITY => Error::Security {
                package: String::new(),
                violation: cause,
            },
            ErrorCode::EVALIDATION => Error::Validation(cause),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Install(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Parse(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Parse(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Validation(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_defaults_to_validation() {
        let err = Error::wrap("boom", ErrorCode::EVALIDATION);
        assert!(err.has_code(ErrorCode::EVALIDATION));
        assert_eq!(err.to_string(), "validation failed: boom");
    }

    #[test]
    fn wire_error_carries_context() {
        let err = Error::resolution(
            "no version satisfies range",
            ErrorContext::default().with_package("left-pad"),
        );
        let wire = err.to_wire();
        assert_eq!(wire.code, ErrorCode::ERESOLUTION);
        assert_eq!(wire.context.unwrap().package.as_deref(), Some("left-pad"));
    }
}
