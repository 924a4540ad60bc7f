use crate::errors::Error;
use axum::{http::StatusCode, response::IntoResponse};
use log::error;
use serde::Serialize;
use strum::EnumProperty;

#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub message: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        ApiError {
            message: message.into(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status_code = match self.get_int("status_code") {
            Some(status_code) => match StatusCode::from_u16(status_code as u16) {
                Ok(status_code) => status_code,
                Err(_e) => {
                    // 这可能是一个 bug：某个错误类型定义了无效的状态码
                    error!(
                        "This may be a bug: an error type defined an invalid status code: {status_code}"
                    );

                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            // 没有状态码的错误都是内部错误
            None => {
                error!("Request failed: {self}");

                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status_code, axum::Json(ApiError::new(self.to_string()))).into_response()
    }
}
