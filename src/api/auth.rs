//! Bearer-token authentication middleware

use crate::db::models::{Role, User};
use crate::error::{AppError, Result};
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

/// Authenticated caller, attached as a request extension after the
/// bearer token resolves to a user row.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token = bearer_token(&request)
        .ok_or_else(|| AppError::Authorization("Missing bearer token".to_string()))?;
    let user = state
        .db
        .find_user_by_token(token)?
        .ok_or_else(|| AppError::Authorization("Invalid API token".to_string()))?;

    request.extensions_mut().insert(AuthUser(user));
    Ok(next.run(request).await)
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Broker catalog writes are restricted to admins.
pub fn require_admin(user: &User) -> Result<()> {
    if user.role == Role::Admin {
        Ok(())
    } else {
        Err(AppError::Authorization(
            "Admin privileges required".to_string(),
        ))
    }
}
