use serde::{Serialize, Deserialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ErrorCode {
    #[error("Invalid request")]
    InvalidRequest,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Vote store unavailable")]
    StoreUnavailable,
    #[error("Internal error")]
    InternalError,
}

impl ErrorCode {
    pub fn status_code(self) -> u16 {
        match self {
            ErrorCode::InvalidRequest => 400,
            ErrorCode::MethodNotAllowed => 405,
            ErrorCode::StoreUnavailable => 500,
            ErrorCode::InternalError => 500,
        }
    }
}

/// Body returned for every failed call. `success` is always `false`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

#[cfg(feature = "backend")]
mod backend_impl {
    use super::ErrorCode;
    use rocket::http::Status;

    impl From<ErrorCode> for Status {
        fn from(code: ErrorCode) -> Self {
            Status::new(code.status_code())
        }
    }
}
