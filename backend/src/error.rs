use rocket::http::Header;
use rocket::response::Responder;
use rocket::serde::json::Json;
use shared::{ErrorCode, ErrorResponse, ValidationError};
use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Method Not Allowed")]
    MethodNotAllowed,
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::InvalidRequest(_) => ErrorCode::InvalidRequest,
            ApiError::MethodNotAllowed => ErrorCode::MethodNotAllowed,
            ApiError::StoreUnavailable(_) => ErrorCode::StoreUnavailable,
            ApiError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Text safe to hand back to the caller. Store details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::InvalidRequest(reason) => reason.clone(),
            ApiError::MethodNotAllowed => "Method Not Allowed".into(),
            ApiError::StoreUnavailable(_) => "Vote store initialization failed.".into(),
            ApiError::Internal(_) => "Internal server error processing vote.".into(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::InvalidRequest(e.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable(_) => ApiError::StoreUnavailable(e.to_string()),
            _ => ApiError::Internal(e.to_string()),
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for ApiError {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let body = Json(ErrorResponse::new(self.public_message()));
        let mut response = rocket::Response::build_from(body.respond_to(req)?);
        response.status(self.code().into());

        if let ApiError::MethodNotAllowed = self {
            response.header(Header::new("Allow", "POST"));
        }

        response.ok()
    }
}
