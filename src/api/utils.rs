//! Utility extractors for REST API handlers.

use axum::extract::FromRequest;

use crate::api::error::ApiError;

/// `Json` extractor whose rejections render as [`ApiError`] (400) instead of
/// axum's plain-text 415/422 responses.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
