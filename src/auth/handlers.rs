use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{post, put},
    Extension, Json, Router,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{AuthResponse, ChangePasswordRequest, LoginRequest, RefreshRequest, RegisterRequest},
    jwt::{JwtKeys, TokenSubject},
    middleware::AuthUser,
    password::{hash_password_blocking, verify_password_blocking},
};
use crate::{
    error::{ApiError, ApiResult, MessageResponse},
    extract::{all_required, required, AppJson},
    state::AppState,
    users::{
        repo_types::User,
        services::{create_account, NewAccount, FIELDS_REQUIRED},
    },
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh-token", post(refresh))
}

/// Routes that run behind `require_auth`.
pub fn account_routes() -> Router<AppState> {
    Router::new().route("/change-password", put(change_password))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let account = NewAccount::parse(payload.username, payload.email, payload.password)?;
    create_account(&state, account).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("User registered successfully")),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let [email, password] = all_required([payload.email, payload.password])
        .ok_or_else(|| ApiError::bad_request(FIELDS_REQUIRED))?;

    let user = match required(payload.username) {
        Some(username) => {
            let user = User::find_by_username(&state.db, &username)
                .await?
                .ok_or_else(|| {
                    warn!(%username, "login unknown username");
                    ApiError::bad_request("Invalid username")
                })?;
            if user.email != email {
                warn!(user_id = user.id, "login email mismatch");
                return Err(ApiError::bad_request("Invalid email"));
            }
            user
        }
        None => User::find_by_email(&state.db, &email)
            .await?
            .ok_or_else(|| {
                warn!(%email, "login unknown email");
                ApiError::bad_request("Invalid email")
            })?,
    };

    if !verify_password_blocking(password, user.password.clone()).await? {
        warn!(user_id = user.id, "login invalid password");
        return Err(ApiError::bad_request("Invalid password"));
    }

    let keys = JwtKeys::from_ref(&state);
    let subject = subject_of(&user);
    let token = keys.sign_access(&subject)?;
    let refresh_token = keys.sign_refresh(&subject)?;

    info!(user_id = user.id, username = %user.username, "user logged in");
    Ok(Json(AuthResponse {
        message: "Login successful".into(),
        user: user.into(),
        token,
        refresh_token,
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RefreshRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let raw = required(payload.refresh_token)
        .ok_or_else(|| ApiError::bad_request("refreshToken is required"))?;

    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_refresh(&raw).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        ApiError::unauthorized("Invalid token")
    })?;

    // deleted accounts cannot mint new tokens
    let user = User::find_by_id(&state.db, claims.id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    let subject = subject_of(&user);
    let token = keys.sign_access(&subject)?;
    let refresh_token = keys.sign_refresh(&subject)?;

    Ok(Json(AuthResponse {
        message: "Token refreshed".into(),
        user: user.into(),
        token,
        refresh_token,
    }))
}

#[instrument(skip(state, auth, payload), fields(user_id = auth.id()))]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppJson(payload): AppJson<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let [old_password, new_password] = all_required([payload.old_password, payload.new_password])
        .ok_or_else(|| ApiError::bad_request("Old and new password are required"))?;

    let user = User::find_by_id(&state.db, auth.id())
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    if !verify_password_blocking(old_password, user.password).await? {
        warn!("old password mismatch");
        return Err(ApiError::bad_request("Old password is incorrect"));
    }

    let hash = hash_password_blocking(new_password).await?;
    if !User::set_password(&state.db, user.id, &hash).await? {
        return Err(ApiError::unauthorized("User not found"));
    }

    info!("password changed");
    Ok(Json(MessageResponse::new("Password changed successfully")))
}

fn subject_of(user: &User) -> TokenSubject {
    TokenSubject {
        id: user.id,
        username: Some(user.username.clone()),
        email: user.email.clone(),
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request, middleware};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::middleware::{require_auth, TOKEN_HEADER};

    fn app() -> Router {
        let state = AppState::fake();
        Router::new()
            .merge(auth_routes())
            .merge(
                account_routes()
                    .route_layer(middleware::from_fn_with_state(state.clone(), require_auth)),
            )
            .with_state(state)
    }

    async fn message(resp: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        v["message"].as_str().unwrap_or_default().to_string()
    }

    fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn register_missing_fields_is_400() {
        let resp = app()
            .oneshot(json_request("POST", "/register", r#"{"username":"alice","email":""}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(message(resp).await, FIELDS_REQUIRED);
    }

    #[tokio::test]
    async fn login_missing_password_is_400() {
        let resp = app()
            .oneshot(json_request("POST", "/login", r#"{"email":"a@x.io"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn refresh_with_garbage_is_401() {
        let resp = app()
            .oneshot(json_request("POST", "/refresh-token", r#"{"refreshToken":"junk"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(message(resp).await, "Invalid token");
    }

    #[tokio::test]
    async fn change_password_requires_token() {
        let resp = app()
            .oneshot(json_request(
                "PUT",
                "/change-password",
                r#"{"oldPassword":"a","newPassword":"b"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(message(resp).await, "No token provided");
    }

    #[tokio::test]
    async fn change_password_requires_both_fields() {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state)
            .sign_access(&TokenSubject {
                id: 1,
                username: Some("alice".into()),
                email: "alice@example.com".into(),
            })
            .unwrap();
        let mut req = json_request("PUT", "/change-password", r#"{"oldPassword":"a"}"#);
        req.headers_mut()
            .insert(TOKEN_HEADER, token.parse().unwrap());
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(message(resp).await, "Old and new password are required");
    }
}
