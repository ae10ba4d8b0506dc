pub mod handlers;
mod services;

use crate::state::AppState;
use axum::Router;

/// Routes that run behind `require_auth`.
pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::profile_routes())
}
