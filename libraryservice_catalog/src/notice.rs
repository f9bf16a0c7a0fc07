use serde::{Deserialize, Serialize};

use crate::catalog_service::CatalogError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Warning,
    Error,
}

/// Human readable feedback for the user after an operation
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Notice {
    pub message: String,
    pub severity: Severity,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Success,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Warning,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Error,
        }
    }
}

impl From<&CatalogError> for Notice {
    fn from(err: &CatalogError) -> Self {
        Notice::error(err.to_string())
    }
}
