use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Field name (as submitted by the form) to its first error message.
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    #[default]
    Idle,
    Success,
    Error,
}

/// Outcome of a form mutation, rendered inline next to the form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ActionState {
    pub status: ActionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<FieldErrors>,
}

impl ActionState {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ActionStatus::Success,
            message: Some(message.into()),
            field_errors: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ActionStatus::Error,
            message: Some(message.into()),
            field_errors: None,
        }
    }

    pub fn invalid(message: impl Into<String>, field_errors: FieldErrors) -> Self {
        Self {
            status: ActionStatus::Error,
            message: Some(message.into()),
            field_errors: Some(field_errors),
        }
    }

    pub fn field_error(message: impl Into<String>, field: &str, error: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), error.into());
        Self::invalid(message, errors)
    }

    pub fn is_success(&self) -> bool {
        self.status == ActionStatus::Success
    }
}
