use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error as ThisError;

/// Outcome taxonomy for the account/session core. Everything a handler can
/// fail with is one of these; store and hasher faults are wrapped into
/// `Store` and never leak details to the client.
#[derive(ThisError, Debug)]
pub enum Error {
    /// Malformed or missing required input.
    #[error("{0}")]
    Validation(String),

    /// An account with this email already exists.
    #[error("User already exists")]
    Conflict,

    /// Wrong email/password pair, or wrong delete-confirmation password.
    /// The message never reveals whether the email existed.
    #[error("{message}")]
    InvalidCredentials { message: &'static str },

    /// Missing, expired or unresolvable session.
    #[error("Unauthorized")]
    Unauthenticated,

    /// The user record vanished between session resolution and use.
    #[error("User not found")]
    NotFound,

    /// The durable store (or hasher) failed; surfaced opaquely.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl Error {
    pub fn invalid_credentials() -> Self {
        Error::InvalidCredentials {
            message: "Invalid credentials",
        }
    }

    pub fn invalid_password() -> Self {
        Error::InvalidCredentials {
            message: "Invalid password",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::Conflict => StatusCode::BAD_REQUEST,
            Error::InvalidCredentials { .. } | Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message, without internal details.
    pub fn user_message(&self) -> String {
        match self {
            Error::Store(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Store(e) => {
                tracing::error!("store failure: {e:#}");
            }
            Error::Unauthenticated | Error::InvalidCredentials { .. } => {
                tracing::info!("auth rejected: {self}");
            }
            other => {
                tracing::debug!("client error: {other}");
            }
        }

        let body = json!({ "message": self.user_message() });
        (self.status_code(), Json(body)).into_response()
    }
}
