use askama::Template;
use axum::extract::rejection::{FormRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use sm_core::error::AppError;
use sm_ui::{ErrorTemplate, Nav};

/// An error on its way to becoming an HTML error page.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        match e {
            AppError::NotFound(what, id) => {
                tracing::debug!(%what, %id, "not found");
                ApiError::not_found("요청한 이야기를 찾을 수 없습니다.")
            }
            AppError::ValidationError(msg) => ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::Conflict(msg) => {
                tracing::warn!(%msg, "write conflict");
                ApiError::new(StatusCode::CONFLICT, "다른 요청과 충돌했습니다. 다시 시도해 주세요.")
            }
            AppError::Internal(msg) => {
                tracing::error!(%msg, "internal error");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "일시적인 오류가 발생했습니다.")
            }
        }
    }
}

pub const BAD_REQUEST_MESSAGE: &str = "잘못된 요청입니다.";

/// Keeps the extractor's status; the detail only goes to the log.
fn rejected(status: StatusCode, detail: String) -> ApiError {
    tracing::debug!(%status, %detail, "request rejected");
    ApiError::new(status, BAD_REQUEST_MESSAGE)
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        rejected(e.status(), e.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(e: PathRejection) -> Self {
        rejected(e.status(), e.body_text())
    }
}

impl From<FormRejection> for ApiError {
    fn from(e: FormRejection) -> Self {
        rejected(e.status(), e.body_text())
    }
}

impl From<askama::Error> for ApiError {
    fn from(e: askama::Error) -> Self {
        tracing::error!(error = %e, "template rendering failed");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "일시적인 오류가 발생했습니다.")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let page = ErrorTemplate {
            nav: Nav::new(None),
            status: self.status.as_u16(),
            message: self.message.clone(),
        };
        match page.render() {
            Ok(html) => (self.status, Html(html)).into_response(),
            Err(e) => {
                tracing::warn!(error = %e, "error page rendering failed");
                (self.status, self.message).into_response()
            }
        }
    }
}
