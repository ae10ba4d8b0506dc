use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection, FromRequest},
    http::StatusCode,
};

use crate::error::ApiError;

/// `Json` whose rejection renders as a 400 `{"message": ...}` like every other error.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

pub const FILE_TOO_LARGE: &str = "File too large";

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(FILE_TOO_LARGE.into())
        } else {
            ApiError::bad_request(err.body_text())
        }
    }
}

/// Present and non-empty.
pub fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Like [`required`] but for several fields at once.
pub fn all_required<const N: usize>(values: [Option<String>; N]) -> Option<[String; N]> {
    if values.iter().any(|v| v.as_deref().map_or(true, str::is_empty)) {
        return None;
    }
    Some(values.map(|v| v.unwrap_or_default()))
}
