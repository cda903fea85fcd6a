use serde::{Deserialize, Serialize};

use super::ApiError;

/// Logical success code inside the envelope
pub const SUCCESS_CODE: i64 = 200;

/// The `{code, data, message}` wrapper around every backend payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    /// Unwrap the payload. A non-200 code is a server error carrying the
    /// backend's message.
    pub fn into_result(self) -> Result<Option<T>, ApiError> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(ApiError::server_message(self.message))
        }
    }
}
