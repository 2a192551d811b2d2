//! API Middleware
//!
//! API-key authentication and request logging.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::OperationContext;
use crate::error::AppError;

/// Permission required by catalog and user management routes
pub const ADMIN_PERMISSION: &str = "admin";

/// API Key authentication result
#[derive(Debug, Clone)]
pub struct AuthenticatedApiKey {
    pub id: Uuid,
    pub name: String,
    pub permissions: Vec<String>,
}

impl AuthenticatedApiKey {
    /// Check if this API key has a specific permission
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .iter()
            .any(|p| p == permission || p == ADMIN_PERMISSION)
    }

    pub fn is_admin(&self) -> bool {
        self.has_permission(ADMIN_PERMISSION)
    }
}

/// Request user from X-Request-User-Id header
#[derive(Debug, Clone, Copy)]
pub struct RequestUser {
    pub user_id: Uuid,
}

/// Hex SHA-256 digest stored in `api_keys.key_hash`
pub fn hash_api_key(raw_key: &str) -> String {
    hex::encode(Sha256::digest(raw_key.as_bytes()))
}

/// Extract and validate API key from X-API-Key header
pub async fn auth_middleware(
    State(pool): State<PgPool>,
    headers: HeaderMap,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let api_key = headers
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::MissingHeader("X-API-Key".to_string()).into_response())?;

    let api_key_record: Option<(Uuid, String, Vec<String>, bool)> = sqlx::query_as(
        r#"
        SELECT id, name, permissions, is_active
        FROM api_keys
        WHERE key_hash = $1
        "#,
    )
    .bind(hash_api_key(api_key))
    .fetch_optional(&pool)
    .await
    .map_err(|e| AppError::Database(e).into_response())?;

    // Unknown and disabled keys are rejected alike
    let (api_key_id, name, permissions) = match api_key_record {
        Some((id, name, permissions, true)) => (id, name, permissions),
        _ => return Err(AppError::InvalidApiKey.into_response()),
    };

    request.extensions_mut().insert(AuthenticatedApiKey {
        id: api_key_id,
        name,
        permissions,
    });

    let mut context = OperationContext::new().with_api_key(api_key_id);

    // Routes that act on behalf of a user check for the RequestUser extension
    if let Some(raw) = headers.get("X-Request-User-Id").and_then(|v| v.to_str().ok()) {
        let user_id = Uuid::parse_str(raw.trim()).map_err(|_| {
            AppError::InvalidRequest("Invalid X-Request-User-Id header format".to_string())
                .into_response()
        })?;
        request.extensions_mut().insert(RequestUser { user_id });
        context = context.with_request_user(user_id);
    }

    let correlation_id = headers
        .get("X-Correlation-Id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    request
        .extensions_mut()
        .insert(context.with_correlation_id(correlation_id));

    Ok(next.run(request).await)
}

/// Headers that should be masked in logs
const SENSITIVE_HEADERS: &[&str] = &["x-api-key", "authorization", "cookie", "set-cookie"];

/// Mask sensitive headers for logging
pub fn mask_headers_for_logging(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let name_lower = name.as_str().to_lowercase();
            let masked_value = if SENSITIVE_HEADERS.contains(&name_lower.as_str()) {
                "[REDACTED]".to_string()
            } else {
                value.to_str().unwrap_or("[invalid utf8]").to_string()
            };
            (name.to_string(), masked_value)
        })
        .collect()
}

/// Request logging middleware
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let headers = mask_headers_for_logging(request.headers());

    let correlation_id = request
        .extensions()
        .get::<OperationContext>()
        .and_then(|ctx| ctx.correlation_id);

    let start = std::time::Instant::now();

    tracing::info!(
        method = %method,
        uri = %uri,
        correlation_id = ?correlation_id,
        headers = ?headers,
        "Incoming request"
    );

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        duration_ms = %start.elapsed().as_millis(),
        correlation_id = ?correlation_id,
        "Request completed"
    );

    response
}
