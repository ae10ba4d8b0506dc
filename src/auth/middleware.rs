use axum::{
    extract::{FromRef, Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use super::{claims::Claims, jwt::JwtKeys};
use crate::{error::ApiError, state::AppState};

/// Header carrying the access token. Not `Authorization: Bearer`.
pub const TOKEN_HEADER: &str = "x-auth-token";

/// Decoded identity of the caller, placed into request extensions by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn id(&self) -> i32 {
        self.0.id
    }
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::unauthorized("No token provided"))?;

    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_access(token).map_err(|e| {
        warn!(error = %e, "rejected token");
        ApiError::unauthorized("Invalid token")
    })?;

    debug!(user_id = claims.id, "request authenticated");
    req.extensions_mut().insert(AuthUser(claims));
    Ok(next.run(req).await)
}
