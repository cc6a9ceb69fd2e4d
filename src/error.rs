use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::viewport::Viewport;

#[derive(Debug, Error)]
pub enum LvrError {
    #[error("At least {required} samples are required, got {actual}")]
    InsufficientSamples { required: usize, actual: usize },

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Viewport mismatch: baseline is {baseline}, current is {current}")]
    ViewportMismatch { baseline: Viewport, current: Viewport },

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LvrError {
    pub fn invalid_snapshot(message: impl Into<String>) -> Self {
        LvrError::InvalidSnapshot(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        LvrError::Config(message.into())
    }

    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            LvrError::InsufficientSamples { required, .. } => ErrorPayload::new(
                ErrorCategory::Input,
                self.to_string(),
                format!("Capture at least {required} snapshots of the same page before calibrating."),
            ),
            LvrError::InvalidSnapshot(_) => ErrorPayload::new(
                ErrorCategory::Input,
                self.to_string(),
                "Re-capture the snapshot; every element needs a finite, non-negative rect and the viewport must be non-zero.",
            ),
            LvrError::ViewportMismatch { .. } => ErrorPayload::new(
                ErrorCategory::Input,
                self.to_string(),
                "Capture both snapshots at the same viewport, or set allow_viewport_mismatch in the compare config.",
            ),
            LvrError::InvalidSelector(_) => ErrorPayload::new(
                ErrorCategory::Config,
                self.to_string(),
                "Use #id, .class, tag, or a compound such as div#hero.banner.",
            ),
            LvrError::Config(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("weight") {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Weights must be non-negative and at least one must be positive.",
                    )
                } else if lower.contains("percent") || lower.contains("0-100") {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Percentages and similarity thresholds are expressed on a 0-100 scale.",
                    )
                } else {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Check flags and the config file (TOML or YAML) for typos and out-of-range values.",
                    )
                }
            }
            LvrError::Serialization(e) => ErrorPayload::new(
                ErrorCategory::Input,
                e.to_string(),
                "Check that the snapshot JSON has url, viewport and elements fields.",
            ),
            LvrError::Io(e) => ErrorPayload::new(
                ErrorCategory::Io,
                e.to_string(),
                "Check file paths/permissions.",
            ),
        }
    }
}

pub type Result<T> = std::result::Result<T, LvrError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Input,
    Config,
    Io,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl ErrorPayload {
    pub fn new(category: ErrorCategory, message: String, remediation: impl Into<String>) -> Self {
        Self {
            category,
            message,
            remediation: Some(remediation.into()),
        }
    }
}
