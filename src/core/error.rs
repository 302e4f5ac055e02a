//! Failure taxonomy of backend calls and its translation to user-facing text.

use crate::core::models::FieldError;

pub const GENERIC_MESSAGE: &str = "An unexpected error occurred.";

/// The ways a backend call can fail.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("request failed: {0}")]
    Transport(String),

    /// The backend answered with a non-2xx status. `message` and `errors` are
    /// taken from the response envelope when one was present.
    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Http {
        status: u16,
        message: Option<String>,
        errors: Vec<FieldError>,
    },

    /// A 2xx response whose envelope carried `success: false`.
    #[error("request rejected: {}", .message.as_deref().unwrap_or("no message"))]
    Logical {
        status: u16,
        message: Option<String>,
        errors: Vec<FieldError>,
    },

    /// Input rejected locally before any request was sent.
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    /// The response could not be decoded into the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The call needs a session token and none is stored.
    #[error("not signed in")]
    NotAuthenticated,
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } | ApiError::Logical { status, .. } => Some(*status),
            ApiError::NotAuthenticated => Some(401),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

/// Canned sentence for the HTTP statuses the backend commonly returns.
pub fn status_message(status: u16) -> Option<&'static str> {
    match status {
        400 => Some("Invalid request. Please check your input."),
        401 => Some("Session expired. Please log in again."),
        403 => Some("You don't have permission to perform this action."),
        404 => Some("The requested resource was not found."),
        409 => Some("This resource already exists."),
        500 => Some("Server error. Please try again later."),
        _ => None,
    }
}

pub fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Reduces any [`ApiError`] to the single line shown to the user.
///
/// Field errors win over the envelope message, which wins over the canned
/// per-status sentence.
pub fn user_message(error: &ApiError) -> String {
    match error {
        ApiError::Validation(errors) => join_field_errors(errors),
        ApiError::Http {
            status,
            message,
            errors,
        } => envelope_message(message, errors)
            .or_else(|| status_message(*status).map(str::to_string))
            .unwrap_or_else(|| GENERIC_MESSAGE.to_string()),
        ApiError::Logical {
            message, errors, ..
        } => envelope_message(message, errors).unwrap_or_else(|| "Request failed".to_string()),
        ApiError::Transport(detail) => format!("Network error: {detail}"),
        ApiError::NotAuthenticated => status_message(401).unwrap_or(GENERIC_MESSAGE).to_string(),
        ApiError::Decode(_) => GENERIC_MESSAGE.to_string(),
    }
}

fn envelope_message(message: &Option<String>, errors: &[FieldError]) -> Option<String> {
    if !errors.is_empty() {
        return Some(join_field_errors(errors));
    }
    message.as_ref().filter(|m| !m.trim().is_empty()).cloned()
}
