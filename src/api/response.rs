//! Success response envelope

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pagination::{Page, Pagination};

/// `{status: "success", message, data, pagination?}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: &'static str,
    pub message: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(skip)]
    code: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: "success",
            message: message.into(),
            data,
            pagination: None,
            code: StatusCode::OK,
        }
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            code: StatusCode::CREATED,
            ..Self::ok(message, data)
        }
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

impl<R: Serialize> ApiResponse<Vec<R>> {
    pub fn page(message: impl Into<String>, page: Page<R>) -> Self {
        Self::ok(message, page.records).with_pagination(page.pagination)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.code, Json(self)).into_response()
    }
}
