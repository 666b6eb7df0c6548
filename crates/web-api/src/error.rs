use application::ApplicationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::{DomainError, RepositoryError};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", message)
    }
}

/// WebSocket 的 error 事件复用同一套错误码。
pub fn error_code(error: &ApplicationError) -> &'static str {
    match error {
        ApplicationError::Domain(DomainError::SelfChat) => "SELF_CHAT",
        ApplicationError::Domain(DomainError::UnknownUser { .. }) => "UNKNOWN_USER",
        ApplicationError::Domain(DomainError::InvalidMembers { .. }) => "INVALID_MEMBERS",
        ApplicationError::Domain(DomainError::RoomNotFound) => "ROOM_NOT_FOUND",
        ApplicationError::Domain(DomainError::Forbidden) => "FORBIDDEN",
        ApplicationError::Domain(DomainError::InvalidArgument { .. }) => "INVALID_ARGUMENT",
        ApplicationError::Repository(RepositoryError::Storage { .. }) => "STORAGE_ERROR",
        ApplicationError::Unauthenticated => "UNAUTHENTICATED",
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        let code = error_code(&error);
        match error {
            ApplicationError::Domain(DomainError::SelfChat) => ApiError::new(
                StatusCode::BAD_REQUEST,
                code,
                "cannot start a chat with yourself",
            ),
            ApplicationError::Domain(DomainError::UnknownUser { identifier }) => ApiError::new(
                StatusCode::NOT_FOUND,
                code,
                format!("user not registered: {identifier}"),
            ),
            ApplicationError::Domain(DomainError::InvalidMembers { identifiers }) => {
                ApiError::new(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    code,
                    format!("these users are not registered: {}", identifiers.join(", ")),
                )
            }
            ApplicationError::Domain(DomainError::RoomNotFound) => {
                ApiError::new(StatusCode::NOT_FOUND, code, "room not found")
            }
            // 拒绝之外不泄漏任何房间信息
            ApplicationError::Domain(DomainError::Forbidden) => {
                ApiError::new(StatusCode::FORBIDDEN, code, "access denied")
            }
            ApplicationError::Domain(DomainError::InvalidArgument { field, reason }) => {
                ApiError::new(
                    StatusCode::BAD_REQUEST,
                    code,
                    format!("{field}: {reason}"),
                )
            }
            ApplicationError::Repository(RepositoryError::Storage { message }) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                code,
                format!("storage error: {message}"),
            ),
            ApplicationError::Unauthenticated => {
                ApiError::new(StatusCode::UNAUTHORIZED, code, "authentication required")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
