//! Success response helpers. Errors go through `AppError`.

use axum::{http::StatusCode, Json};
use serde::Serialize;

/// `{"message": "<text>"}`
#[derive(Serialize)]
pub struct MessageBody {
    pub message: String,
}

pub fn ok<T: Serialize>(data: T) -> (StatusCode, Json<T>) {
    (StatusCode::OK, Json(data))
}

pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<T>) {
    (StatusCode::CREATED, Json(data))
}

pub fn message(text: impl Into<String>) -> (StatusCode, Json<MessageBody>) {
    (StatusCode::OK, Json(MessageBody { message: text.into() }))
}
