//! Body and query extractors whose rejections go through [`ApiError`], so a
//! malformed request gets the same `{"error": ...}` body as every other
//! failure.

use axum::extract::{FromRequest, FromRequestParts, Query};

use crate::error::ApiError;

/// `axum::Json` with an [`ApiError`] rejection.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// `axum::extract::Query` with an [`ApiError`] rejection.
#[derive(Debug, FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
pub struct QueryParams<T>(pub T);
