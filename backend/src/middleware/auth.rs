//! Authentication middleware
//!
//! Tokens are issued by the external login service. This layer only verifies
//! the bearer token against the shared secret and exposes the operator to
//! handlers, whose username becomes the activity-log actor.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, errors::ErrorKind, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::JwtConfig;
use crate::error::{AppError, ErrorResponse};
use crate::AppState;

/// Authenticated operator extracted from the JWT
#[derive(Clone, Debug)]
pub struct Operator {
    pub user_id: i64,
    pub username: String,
    pub role: String,
}

impl Operator {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    pub username: String,
    pub role: String,
    pub exp: i64,
}

/// Decode and validate a bearer token
pub fn decode_operator_token(token: &str, jwt: &JwtConfig) -> Result<Operator, AppError> {
    let mut validation = Validation::default();
    validation.leeway = jwt.leeway_secs;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })?;

    if claims.username.trim().is_empty() {
        return Err(AppError::InvalidToken);
    }

    Ok(Operator {
        user_id: claims.id,
        username: claims.username,
        role: claims.role,
    })
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) => token,
        None => {
            return AppError::Unauthorized("Missing or invalid Authorization header".to_string())
                .into_response();
        }
    };

    let operator = match decode_operator_token(token, &state.config.jwt) {
        Ok(operator) => operator,
        Err(e) => return e.into_response(),
    };

    request.extensions_mut().insert(operator);

    next.run(request).await
}

/// Extractor for the authenticated operator
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub Operator);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Operator>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                let error = ErrorResponse {
                    error: crate::error::ErrorDetail {
                        code: "UNAUTHORIZED".to_string(),
                        message_en: "Authentication required".to_string(),
                        message_es: "Se requiere iniciar sesión".to_string(),
                        field: None,
                        retryable: false,
                    },
                };
                (StatusCode::UNAUTHORIZED, Json(error))
            })
    }
}
