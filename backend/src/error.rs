//! Error handling for the Stockroom inventory backend
//!
//! Provides consistent error responses in English and Spanish

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::FifoError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_es: String,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Stock errors
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },

    // Storage errors
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Operation timed out after {0} ms")]
    Timeout(u64),

    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    /// Validation failure on a single field
    pub fn validation(field: &str, message: &str, message_es: &str) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.to_string(),
            message_es: message_es.to_string(),
        }
    }

    /// Whether the caller may retry the same request unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::StorageError(_) | AppError::Timeout(_) | AppError::DatabaseError(_)
        )
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field_errors = errors.field_errors();
        let (field, message) = field_errors
            .iter()
            .next()
            .map(|(field, errs)| {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| format!("Invalid value for {}", field));
                (field.to_string(), message)
            })
            .unwrap_or_else(|| ("input".to_string(), errors.to_string()));

        AppError::Validation {
            message_es: format!("Dato inválido en {}", field),
            field,
            message,
        }
    }
}

impl From<FifoError> for AppError {
    fn from(err: FifoError) -> Self {
        match err {
            FifoError::NegativeQuantity(_) => AppError::validation(
                "quantity",
                &err.to_string(),
                "La cantidad no puede ser negativa",
            ),
            FifoError::QuantityOverflow => AppError::InvalidQuantity(err.to_string()),
        }
    }
}

/// SQLSTATE classes 22 (data exception) and 23 (integrity constraint) are
/// caused by the request itself and will fail again on retry.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            let rejected = db
                .code()
                .map(|code| code.starts_with("22") || code.starts_with("23"))
                .unwrap_or(false);
            if rejected {
                return AppError::ConstraintViolation(db.message().to_string());
            }
        }
        AppError::DatabaseError(err)
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_es: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub retryable: bool,
}

impl AppError {
    fn status_and_detail(&self) -> (StatusCode, ErrorDetail) {
        let retryable = self.is_retryable();
        let detail = |code: &str, message_en: String, message_es: String, field: Option<String>| {
            ErrorDetail {
                code: code.to_string(),
                message_en,
                message_es,
                field,
                retryable,
            }
        };

        match self {
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                detail(
                    "TOKEN_EXPIRED",
                    "Token has expired".to_string(),
                    "El token ha expirado".to_string(),
                    None,
                ),
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                detail(
                    "INVALID_TOKEN",
                    "Invalid token".to_string(),
                    "Token inválido".to_string(),
                    None,
                ),
            ),
            AppError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                detail(
                    "UNAUTHORIZED",
                    message.clone(),
                    "No autorizado".to_string(),
                    None,
                ),
            ),
            AppError::Forbidden(message) => (
                StatusCode::FORBIDDEN,
                detail(
                    "FORBIDDEN",
                    message.clone(),
                    "No tiene permiso para realizar esta acción".to_string(),
                    None,
                ),
            ),
            AppError::Validation { field, message, message_es } => (
                StatusCode::BAD_REQUEST,
                detail(
                    "VALIDATION_ERROR",
                    message.clone(),
                    message_es.clone(),
                    Some(field.clone()),
                ),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                detail(
                    "NOT_FOUND",
                    format!("{} not found", resource),
                    format!("{} no encontrado", resource),
                    None,
                ),
            ),
            AppError::InvalidQuantity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                detail(
                    "INVALID_QUANTITY",
                    msg.clone(),
                    format!("Cantidad inválida: {}", msg),
                    Some("quantity".to_string()),
                ),
            ),
            AppError::InsufficientStock { requested, available } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                detail(
                    "INSUFFICIENT_STOCK",
                    format!("Requested {} units but only {} are available", requested, available),
                    format!("Se solicitaron {} unidades pero solo hay {} disponibles", requested, available),
                    Some("quantity".to_string()),
                ),
            ),
            AppError::StorageError(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                detail(
                    "STORAGE_ERROR",
                    format!("Storage error: {}", msg),
                    "Error de almacenamiento, intente de nuevo".to_string(),
                    None,
                ),
            ),
            AppError::Timeout(ms) => (
                StatusCode::SERVICE_UNAVAILABLE,
                detail(
                    "TIMEOUT",
                    format!("The operation did not finish within {} ms and was rolled back", ms),
                    "La operación excedió el tiempo límite y fue revertida".to_string(),
                    None,
                ),
            ),
            AppError::DatabaseError(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                detail(
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                    "Ocurrió un error en la base de datos".to_string(),
                    None,
                ),
            ),
            AppError::ConstraintViolation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                detail(
                    "CONSTRAINT_VIOLATION",
                    format!("The request was rejected by the database: {}", msg),
                    "La base de datos rechazó la solicitud".to_string(),
                    None,
                ),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                detail(
                    "INTERNAL_ERROR",
                    msg.clone(),
                    "Error interno del servidor".to_string(),
                    None,
                ),
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                detail(
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    "Error interno del servidor".to_string(),
                    None,
                ),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = self.status_and_detail();

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers and services
pub type AppResult<T> = Result<T, AppError>;
