use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{AddUserRequest, UpdateUserRequest, UserPage, UserResponse},
    repo_types::User,
    services::{create_account, NewAccount, USERNAME_TAKEN},
};
use crate::{
    db::is_unique_violation,
    error::{ApiError, ApiResult, MessageResponse},
    extract::{all_required, AppJson},
    pagination::PageQuery,
    state::AppState,
};

const DEFAULT_USER_LIMIT: i64 = 5;

pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard/add-users", get(list_users))
        .route("/dashboard/add-user", post(add_user))
        .route("/users/:username", put(update_user).delete(delete_user))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<UserPage>> {
    let page = q.resolve(DEFAULT_USER_LIMIT);
    let users = User::list_page(&state.db, page.limit, page.offset()).await?;
    let total_users = User::count(&state.db).await?;

    Ok(Json(UserPage {
        page: page.page,
        limit: page.limit,
        total_users,
        total_pages: page.total_pages(total_users),
        users,
    }))
}

#[instrument(skip(state, payload))]
pub async fn add_user(
    State(state): State<AppState>,
    AppJson(payload): AppJson<AddUserRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let account = NewAccount::parse(payload.username, payload.email, payload.password)?;
    create_account(&state, account).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Dashboard user added successfully")),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    let [new_username, new_email] = all_required([payload.new_username, payload.new_email])
        .ok_or_else(|| ApiError::bad_request("Both username and email are required"))?;

    if new_username != username
        && User::id_by_username(&state.db, &new_username).await?.is_some()
    {
        warn!(%username, %new_username, "rename collides with existing user");
        return Err(ApiError::bad_request(USERNAME_TAKEN));
    }

    let user = User::rename(&state.db, &username, &new_username, &new_email)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::bad_request(USERNAME_TAKEN)
            } else {
                e.into()
            }
        })?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    info!(user_id = user.id, %username, new_username = %user.username, "user updated");
    Ok(Json(UserResponse {
        message: "User updated successfully".into(),
        user: user.into(),
    }))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let user = User::delete_by_username(&state.db, &username)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    info!(user_id = user.id, %username, "user deleted");
    Ok(Json(MessageResponse::new("User deleted successfully")))
}
