use axum::http::StatusCode;
use std::fmt;
use thiserror::Error;

/// The three generic verbs issued against the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Select,
    Insert,
    Update,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Select => "select",
            Operation::Insert => "insert",
            Operation::Update => "update",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store is not configured: {0}")]
    NotConfigured(String),

    #[error("{operation} on `{table}` could not reach the store: {message}")]
    Unreachable {
        operation: Operation,
        table: &'static str,
        message: String,
    },

    #[error("{operation} on `{table}` was rejected ({status}): {message}")]
    Rejected {
        operation: Operation,
        table: &'static str,
        status: u16,
        message: String,
    },

    #[error("{operation} on `{table}` returned an unreadable row: {message}")]
    Decode {
        operation: Operation,
        table: &'static str,
        message: String,
    },
}

/// Failures that end a bootstrap. The shell shows them as its error state.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no user identity was supplied by the host")]
    NoIdentity,

    #[error("data store unavailable: {0}")]
    Connectivity(#[source] StoreError),

    #[error("profile could not be created: {0}")]
    ProfileCreation(String),

    #[error("stored data could not be read: {0}")]
    InvalidData(#[source] StoreError),
}

impl SessionError {
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::NoIdentity => "identity",
            SessionError::Connectivity(_) => "connectivity",
            SessionError::ProfileCreation(_) => "write_rejected",
            SessionError::InvalidData(_) => "invalid_data",
        }
    }

    /// A failed read during bootstrap. Unreadable rows are kept apart from
    /// an unreachable store.
    pub fn from_lookup(err: StoreError) -> Self {
        match err {
            StoreError::Decode { .. } => SessionError::InvalidData(err),
            other => SessionError::Connectivity(other),
        }
    }

    /// Identity errors can only be escaped by relaunching from the host.
    pub fn retriable(&self) -> bool {
        !matches!(self, SessionError::NoIdentity)
    }
}

/// Failures of a single user action. Bootstrap state is left untouched.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("amount must be a positive whole number of milliliters")]
    InvalidAmount,

    #[error(transparent)]
    Write(#[from] StoreError),

    #[error("the store accepted the {operation} on `{table}` but returned no row")]
    NoRow {
        operation: Operation,
        table: &'static str,
    },

    #[error("session is not ready")]
    NotReady,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is not set")]
    Missing { name: &'static str },

    #[error("{name} still holds a placeholder value")]
    Placeholder { name: &'static str },

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn bad_gateway(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: err.to_string(),
        }
    }
}

impl From<ActionError> for AppError {
    fn from(err: ActionError) -> Self {
        match err {
            ActionError::InvalidAmount => Self::bad_request(err.to_string()),
            ActionError::NotReady => Self {
                status: StatusCode::CONFLICT,
                message: err.to_string(),
            },
            ActionError::Write(_) | ActionError::NoRow { .. } => Self::bad_gateway(err),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_error_kinds_are_stable() {
        assert_eq!(SessionError::NoIdentity.kind(), "identity");
        assert!(!SessionError::NoIdentity.retriable());

        let offline = SessionError::Connectivity(StoreError::Unreachable {
            operation: Operation::Select,
            table: "profiles",
            message: "connection refused".into(),
        });
        assert_eq!(offline.kind(), "connectivity");
        assert!(offline.retriable());
        assert!(offline.to_string().contains("connection refused"));
    }

    #[test]
    fn unreadable_rows_are_not_connectivity_errors() {
        let bad_row = SessionError::from_lookup(StoreError::Decode {
            operation: Operation::Select,
            table: "water_intake",
            message: "premature end of input".into(),
        });
        assert_eq!(bad_row.kind(), "invalid_data");
        assert!(bad_row.to_string().contains("could not be read"));

        let refused = SessionError::from_lookup(StoreError::Rejected {
            operation: Operation::Select,
            table: "profiles",
            status: 401,
            message: "invalid api key".into(),
        });
        assert_eq!(refused.kind(), "connectivity");
    }

    #[test]
    fn action_errors_map_to_http_status() {
        let invalid: AppError = ActionError::InvalidAmount.into();
        assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

        let no_row: AppError = ActionError::NoRow {
            operation: Operation::Insert,
            table: "water_intake",
        }
        .into();
        assert_eq!(no_row.status, StatusCode::BAD_GATEWAY);
        assert!(no_row.message.contains("water_intake"));
    }
}
