use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::auth::TokenDecodeError;

/// Message shown when the backend gives no explanation
pub const GENERIC_SERVER_MESSAGE: &str = "Service error";

pub const SESSION_EXPIRED_MESSAGE: &str = "Login expired, please log in again";

pub const NETWORK_MESSAGE: &str =
    "Network connection failed, please check that the backend service is running";

/// Maximum length for error response bodies in log messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// The four ways a pipeline call can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Local expiry marker passed; nothing was sent
    ClientSideExpired,
    /// Backend answered 401
    SessionInvalid,
    /// No response, connection could not be made
    NetworkUnreachable,
    /// Everything else
    ServerError,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Session expired locally - request not sent")]
    ClientSideExpired,

    #[error("Unauthorized - session is no longer valid")]
    SessionInvalid,

    #[error("Network unreachable: {0}")]
    NetworkUnreachable(#[source] reqwest::Error),

    #[error("Server error: {message}")]
    Server {
        status: Option<StatusCode>,
        message: String,
    },

    #[error("Request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Token cannot be sent as a header")]
    InvalidHeader,

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Invalid session token: {0}")]
    TokenDecode(#[from] TokenDecodeError),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::ClientSideExpired => ErrorKind::ClientSideExpired,
            ApiError::SessionInvalid | ApiError::NotLoggedIn => ErrorKind::SessionInvalid,
            ApiError::NetworkUnreachable(_) => ErrorKind::NetworkUnreachable,
            ApiError::Server { .. }
            | ApiError::Transport(_)
            | ApiError::InvalidResponse(_)
            | ApiError::InvalidHeader
            | ApiError::TokenDecode(_) => ErrorKind::ServerError,
        }
    }

    /// HTTP status, when the failure came with one
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::SessionInvalid => Some(StatusCode::UNAUTHORIZED),
            ApiError::Server { status, .. } => *status,
            _ => None,
        }
    }

    /// Backend-supplied message or generic text for server errors
    pub fn server_message(message: Option<String>) -> Self {
        ApiError::Server {
            status: None,
            message: message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| GENERIC_SERVER_MESSAGE.to_string()),
        }
    }

    /// Text of the notice shown for this failure
    pub fn user_message(&self) -> String {
        match self {
            ApiError::ClientSideExpired | ApiError::SessionInvalid | ApiError::NotLoggedIn => {
                SESSION_EXPIRED_MESSAGE.to_string()
            }
            ApiError::NetworkUnreachable(_) => NETWORK_MESSAGE.to_string(),
            ApiError::Server { message, .. } => message.clone(),
            _ => GENERIC_SERVER_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Truncate a response body to avoid logging excessive data
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        body.to_string()
    } else {
        let cut: String = body.chars().take(MAX_ERROR_BODY_LENGTH).collect();
        format!("{}... (truncated, {} total bytes)", cut, body.len())
    }
}

/// Classify a non-success HTTP response. Pure: no state is touched.
pub fn classify_status(status: StatusCode, body: &str) -> ApiError {
    debug!(status = %status, body = %truncate_body(body), "Classifying error response");
    if status == StatusCode::UNAUTHORIZED {
        return ApiError::SessionInvalid;
    }
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message);
    match ApiError::server_message(message) {
        ApiError::Server { message, .. } => ApiError::Server {
            status: Some(status),
            message,
        },
        other => other,
    }
}

/// Classify a failure where no response arrived. Pure.
pub fn classify_transport(err: reqwest::Error) -> ApiError {
    if err.is_connect() {
        ApiError::NetworkUnreachable(err)
    } else {
        ApiError::Transport(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_401_is_session_invalid() {
        let err = classify_status(StatusCode::UNAUTHORIZED, r#"{"code":401,"message":"bad token"}"#);
        assert!(matches!(err, ApiError::SessionInvalid));
        assert_eq!(err.kind(), ErrorKind::SessionInvalid);
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        assert_eq!(err.user_message(), SESSION_EXPIRED_MESSAGE);
    }

    #[test]
    fn test_backend_message_is_kept() {
        let err = classify_status(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"code":500,"message":"Category still has books"}"#,
        );
        assert_eq!(err.kind(), ErrorKind::ServerError);
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(err.user_message(), "Category still has books");
    }

    #[test]
    fn test_generic_message_without_body() {
        for body in ["", "<html>oops</html>", r#"{"code":403}"#, r#"{"message":"  "}"#] {
            let err = classify_status(StatusCode::FORBIDDEN, body);
            assert_eq!(err.kind(), ErrorKind::ServerError);
            assert_eq!(err.user_message(), GENERIC_SERVER_MESSAGE);
        }
    }

    #[test]
    fn test_kinds_of_local_errors() {
        assert_eq!(ApiError::ClientSideExpired.kind(), ErrorKind::ClientSideExpired);
        assert_eq!(ApiError::NotLoggedIn.kind(), ErrorKind::SessionInvalid);
        assert_eq!(ApiError::InvalidHeader.kind(), ErrorKind::ServerError);
        assert_eq!(
            ApiError::TokenDecode(TokenDecodeError::Malformed).kind(),
            ErrorKind::ServerError
        );
        assert_eq!(ApiError::ClientSideExpired.user_message(), SESSION_EXPIRED_MESSAGE);
    }

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("short"), "short");
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 10);
        let truncated = truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(truncated.ends_with("(truncated, 510 total bytes)"));
    }

    #[tokio::test]
    async fn test_refused_connection_is_network_unreachable() {
        // bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = reqwest::Client::new()
            .get(format!("http://{}/", addr))
            .send()
            .await
            .unwrap_err();
        let classified = classify_transport(err);
        assert_eq!(classified.kind(), ErrorKind::NetworkUnreachable);
        assert_eq!(classified.user_message(), NETWORK_MESSAGE);
    }
}
