//! JSON request bodies.

use axum::extract::FromRequest;

use crate::error::AppError;

/// `axum::Json` with rejections reported as `{"error": "invalid parameters"}`.
///
/// A missing field, a wrong type, malformed JSON and a missing
/// `content-type` all answer 400.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);
