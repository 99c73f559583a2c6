//! JSON request bodies that reject bad input with the application's error body.

use axum::{Json, extract::FromRequest};

use crate::Error;

/// Like [axum::Json], but a body that cannot be decoded is reported as an
/// [Error::InvalidPayload] instead of axum's plain-text rejection.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(Error))]
pub struct JsonPayload<T>(pub T);
