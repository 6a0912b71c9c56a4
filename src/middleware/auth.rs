//! API key authentication middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Extract the claimed application name and API key headers
//! 2. Validate the pair against the credential store
//! 3. Inject authentication context into the request
//! 4. Reject unauthorized requests with HTTP 401
//!
//! It fails closed: if the store cannot answer, the request is rejected
//! with a 500 and never forwarded.

use axum::{
    extract::{Request, State},
    http::HeaderName,
    middleware::Next,
    response::Response,
};

use crate::{AppState, error::AppError};

/// Header carrying the caller's application name.
pub const APP_NAME_HEADER: HeaderName = HeaderName::from_static("x-app-name");

/// Header carrying the caller's API key.
pub const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");

/// Authentication context attached to authenticated requests.
///
/// This struct is inserted into the request's extension map and can be
/// extracted by route handlers to know who made the request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Name of the application whose key was validated
    pub app_name: String,
}

/// API key authentication middleware function.
///
/// # Flow
///
/// 1. Read `X-API-Key`; if it is missing or empty, reject without touching the store
/// 2. Read `X-App-Name` (a missing name simply never validates)
/// 3. Ask the store to validate the pair
/// 4. If valid: inject `AuthContext` into request, call next handler
/// 5. If not valid: return 401 Unauthorized
///
/// # Headers
///
/// ```text
/// X-App-Name: billing-service
/// X-API-Key: 9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08
/// ```
///
/// # Returns
///
/// - `Ok(Response)` if authenticated successfully (calls next handler)
/// - `Err(AppError::Unauthorized)` if the key is missing or invalid (401)
/// - `Err(AppError::Store)` if the store failed (500)
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let api_key = header_str(&request, &API_KEY_HEADER)
        .filter(|key| !key.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| {
            tracing::warn!("Unauthorized: API key is missing");
            AppError::Unauthorized
        })?;

    let claimed_name = header_str(&request, &APP_NAME_HEADER)
        .unwrap_or_default()
        .to_owned();

    let app_name = state
        .store
        .validate(&claimed_name, &api_key)
        .await?
        .ok_or_else(|| {
            tracing::warn!(app = %claimed_name, "Unauthorized: invalid API key");
            AppError::Unauthorized
        })?;

    tracing::debug!(app = %app_name, "Authenticated request");

    // Route handlers can now extract this using Extension<AuthContext>
    request.extensions_mut().insert(AuthContext { app_name });

    Ok(next.run(request).await)
}

fn header_str<'a>(request: &'a Request, name: &HeaderName) -> Option<&'a str> {
    request.headers().get(name).and_then(|h| h.to_str().ok())
}
