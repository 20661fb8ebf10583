//! FOSD-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::loader::session::LoadFailure;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, FosdError>;

/// Top-level error type for the OSD orchestration engine.
#[derive(Debug, Error)]
pub enum FosdError {
    #[error("[FOSD-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[FOSD-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[FOSD-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[FOSD-2001] directory scan failure for {path}: {details}")]
    Scan { path: PathBuf, details: String },

    #[error("[FOSD-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[FOSD-3001] core load already in progress")]
    TransferActive,

    #[error("[FOSD-3002] core load failed: {reason}")]
    Load { reason: LoadFailure },

    #[error("[FOSD-3101] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[FOSD-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl FosdError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "FOSD-1001",
            Self::MissingConfig { .. } => "FOSD-1002",
            Self::ConfigParse { .. } => "FOSD-1003",
            Self::Scan { .. } => "FOSD-2001",
            Self::Serialization { .. } => "FOSD-2101",
            Self::TransferActive => "FOSD-3001",
            Self::Load { .. } => "FOSD-3002",
            Self::Io { .. } => "FOSD-3101",
            Self::Runtime { .. } => "FOSD-3900",
        }
    }

    /// Whether retrying might resolve the failure.
    ///
    /// A failed core load is always retryable: the worst outcome of this
    /// engine is "core failed to load", and the operator can pick it again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::Scan { .. } | Self::Load { .. } | Self::TransferActive
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for FosdError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for FosdError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<toml::ser::Error> for FosdError {
    fn from(value: toml::ser::Error) -> Self {
        Self::Serialization {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<LoadFailure> for FosdError {
    fn from(reason: LoadFailure) -> Self {
        Self::Load { reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<FosdError> {
        vec![
            FosdError::InvalidConfig {
                details: String::new(),
            },
            FosdError::MissingConfig {
                path: PathBuf::new(),
            },
            FosdError::ConfigParse {
                context: "",
                details: String::new(),
            },
            FosdError::Scan {
                path: PathBuf::new(),
                details: String::new(),
            },
            FosdError::Serialization {
                context: "",
                details: String::new(),
            },
            FosdError::TransferActive,
            FosdError::Load {
                reason: LoadFailure::Timeout,
            },
            FosdError::Io {
                path: PathBuf::new(),
                source: std::io::Error::other("test"),
            },
            FosdError::Runtime {
                details: String::new(),
            },
        ]
    }

    #[test]
    fn error_codes_are_unique() {
        let errors = all_variants();
        let codes: Vec<&str> = errors.iter().map(FosdError::code).collect();
        let unique: std::collections::HashSet<&&str> = codes.iter().collect();
        assert_eq!(
            codes.len(),
            unique.len(),
            "error codes must be unique: {codes:?}"
        );
    }

    #[test]
    fn error_display_includes_code() {
        for err in all_variants() {
            let msg = err.to_string();
            assert!(
                msg.contains(err.code()),
                "display should contain error code: {msg}"
            );
            assert!(err.code().starts_with("FOSD-"));
        }
    }

    #[test]
    fn load_failures_are_retryable_config_errors_are_not() {
        assert!(
            FosdError::Load {
                reason: LoadFailure::NotReady
            }
            .is_retryable()
        );
        assert!(FosdError::TransferActive.is_retryable());
        assert!(
            !FosdError::InvalidConfig {
                details: String::new()
            }
            .is_retryable()
        );
        assert!(
            !FosdError::MissingConfig {
                path: PathBuf::new()
            }
            .is_retryable()
        );
    }

    #[test]
    fn io_convenience_constructor() {
        let err = FosdError::io(
            "/media/fat/_Console/NES.rbf",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.code(), "FOSD-3101");
        assert!(err.to_string().contains("NES.rbf"));
    }

    #[test]
    fn from_load_failure_keeps_reason() {
        let err: FosdError = LoadFailure::StreamError.into();
        match err {
            FosdError::Load { reason } => assert_eq!(reason, LoadFailure::StreamError),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("= invalid").unwrap_err();
        let err: FosdError = toml_err.into();
        assert_eq!(err.code(), "FOSD-1003");
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: FosdError = json_err.into();
        assert_eq!(err.code(), "FOSD-2101");
    }
}
