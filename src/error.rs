use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::otp::OtpError;

/// Body shared by every OTP endpoint, success or not.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OtpResponse {
    pub success: bool,
    pub message: String,
}

impl OtpResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into() }
    }
    pub fn failed(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into() }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")] BadRequest(String),
    #[error("Failed to send OTP")] DeliveryFailed,
    #[error("not found")] NotFound,
    #[error("internal error")] Internal,
}

impl From<OtpError> for ApiError {
    fn from(e: OtpError) -> Self {
        match e {
            OtpError::InvalidInput(msg) => ApiError::BadRequest(msg),
            OtpError::Delivery(_) => ApiError::DeliveryFailed,
            OtpError::Internal(msg) => {
                tracing::error!("OTP internal error: {msg}");
                ApiError::Internal
            }
        }
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::DeliveryFailed => StatusCode::BAD_GATEWAY,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        HttpResponse::build(status).json(OtpResponse::failed(self.to_string()))
    }
}
