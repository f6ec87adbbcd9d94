//! Public result shapes: the success/error envelope and the pagination
//! block that is always present on list results, even when empty.

use serde::Serialize;

use civicsignal_common::{CivicSignalError, ErrorKind, Issue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub pages: u32,
    pub total: u64,
}

/// One page of a list query.
#[derive(Debug, Clone, Serialize)]
pub struct IssuePage {
    pub items: Vec<Issue>,
    /// Number of items on this page.
    pub count: usize,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Envelope handed to the presentation layer: an explicit success flag
/// plus either the payload or a stable error kind with a human-readable
/// message.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(err: &CivicSignalError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                kind: err.kind(),
                message: err.to_string(),
            }),
        }
    }
}

impl<T> From<Result<T, CivicSignalError>> for ApiResponse<T> {
    fn from(result: Result<T, CivicSignalError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => Self::err(&err),
        }
    }
}
