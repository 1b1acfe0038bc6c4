use axum::Json;
use axum_macros::FromRequest;

use crate::api_error::ApiError;

/// `Json` extractor whose rejections render as [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct JsonFromRequest<T>(pub T);
