//! HTTP error responses
//!
//! Every failure is rendered as `{"error": "<message>"}` with a fixed,
//! client-facing message. Internal details are only logged.

use crate::services::MessageError;
use crate::storage::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tablon_types::ErrorBody;
use thiserror::Error;

pub const INVALID_PAGINATION: &str =
    "Parámetros de paginación inválidos. Límite debe ser entre 1 y 50, y offset no negativo.";
pub const INVALID_MESSAGE: &str =
    "Datos de mensaje inválidos. Se requiere senderId (número) y content (texto).";
pub const EMPTY_MESSAGE: &str = "El mensaje no puede estar vacío.";
pub const SENDER_NOT_FOUND: &str = "El remitente no existe.";
pub const LIST_MESSAGES_FAILED: &str = "Error interno del servidor al obtener mensajes.";
pub const SUBMIT_MESSAGE_FAILED: &str = "Error interno del servidor al enviar mensaje.";
pub const LIST_USERS_FAILED: &str = "Error interno del servidor al obtener usuarios.";
pub const CSRF_TOKEN_FAILED: &str = "Error interno del servidor al generar el token CSRF.";
pub const UNEXPECTED_ERROR: &str = "Ocurrió un error interno inesperado en el servidor.";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(&'static str),

    #[error("Token CSRF inválido o ausente. Recarga la página.")]
    InvalidCsrfToken,

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{message}")]
    Internal {
        message: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("Demasiadas peticiones desde esta IP, por favor intenta de nuevo más tarde.")]
    TooManyRequests,
}

impl ApiError {
    pub fn internal(message: &'static str, source: impl Into<anyhow::Error>) -> Self {
        ApiError::Internal {
            message,
            source: source.into(),
        }
    }

    /// Map a message service error, using `internal` as the 500 message.
    pub fn from_message_error(err: MessageError, internal: &'static str) -> Self {
        match err {
            MessageError::InvalidPagination => ApiError::BadRequest(INVALID_PAGINATION),
            MessageError::InvalidMessage => ApiError::BadRequest(INVALID_MESSAGE),
            MessageError::EmptyMessage => ApiError::BadRequest(EMPTY_MESSAGE),
            MessageError::SenderNotFound(_) => ApiError::NotFound(SENDER_NOT_FOUND),
            MessageError::Store(StoreError::UnknownSender(_)) => {
                ApiError::NotFound(SENDER_NOT_FOUND)
            }
            MessageError::Store(e) => ApiError::internal(internal, e),
            MessageError::Task(e) => ApiError::internal(internal, e),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCsrfToken => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal { message, source } = &self {
            tracing::error!("{}: {:#}", message, source);
        }

        let body = Json(ErrorBody::new(self.to_string()));
        (self.status(), body).into_response()
    }
}
