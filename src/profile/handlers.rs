use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::get,
    Extension, Json, Router,
};
use tracing::{error, instrument};

use super::services::{update_profile as apply_profile_update, ProfileUpdate};
use crate::{
    auth::middleware::AuthUser,
    error::{ApiError, ApiResult},
    extract::required,
    images::services::{UploadItem, UPLOAD_BODY_LIMIT},
    state::AppState,
    users::{dto::UserResponse, repo_types::{PublicUser, User}},
};

pub fn profile_routes() -> Router<AppState> {
    Router::new().route(
        "/profile",
        get(get_profile)
            .put(update_profile)
            .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
    )
}

#[instrument(skip(state, auth), fields(user_id = auth.id()))]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<PublicUser>> {
    // tokens outlive accounts; a deleted user must not read anything
    let user = User::find_by_id(&state.db, auth.id())
        .await?
        .ok_or_else(|| {
            error!("token refers to a missing user");
            ApiError::unauthorized("User not found")
        })?;
    Ok(Json(user.into()))
}

/// PUT /profile (multipart): `username`, `email`, optional file `profileImage`.
#[instrument(skip(state, auth, mp), fields(user_id = auth.id()))]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    mut mp: Multipart,
) -> ApiResult<Json<UserResponse>> {
    let mut update = ProfileUpdate::default();
    while let Some(field) = mp.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "username" => update.username = required(Some(field.text().await?)),
            "email" => update.email = required(Some(field.text().await?)),
            "profileImage" | "profile_image" | "image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                if file_name.is_empty() {
                    continue;
                }
                // extension is checked before the body is buffered
                let checked = UploadItem::new(&file_name, content_type.as_deref(), Default::default())?;
                let body = field.bytes().await?;
                update.image = Some(UploadItem { body, ..checked });
            }
            _ => {}
        }
    }

    let user = apply_profile_update(&state, auth.id(), update).await?;
    Ok(Json(UserResponse {
        message: "Profile updated successfully".into(),
        user: user.into(),
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        extract::FromRef,
        http::{Request, StatusCode},
        middleware,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::auth::{
        jwt::{JwtKeys, TokenSubject},
        middleware::{require_auth, TOKEN_HEADER},
    };
    use crate::{app::build_app, extract::FILE_TOO_LARGE, state::MemoryStorage};

    const BOUNDARY: &str = "X-PROFILE-BOUNDARY";

    fn token(state: &AppState) -> String {
        JwtKeys::from_ref(state)
            .sign_access(&TokenSubject {
                id: 9,
                username: Some("carol".into()),
                email: "carol@example.com".into(),
            })
            .unwrap()
    }

    fn file_body(file_name: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"username\"\r\n\r\ncarol\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"profileImage\"; filename=\"{file_name}\"\r\n\
             Content-Type: {content_type}\r\n\r\n",
            b = BOUNDARY
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn put_profile(token: String, body: Vec<u8>) -> Request<Body> {
        Request::put("/profile")
            .header(TOKEN_HEADER, token)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn message(resp: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        v["message"].as_str().unwrap_or_default().to_string()
    }

    #[tokio::test]
    async fn profile_requires_token() {
        let state = AppState::fake();
        let app = profile_routes()
            .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
            .with_state(state);
        let resp = app
            .oneshot(Request::get("/profile").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn gif_profile_image_rejected_before_storage() {
        let storage = Arc::new(MemoryStorage::default());
        let state = AppState::fake_with_storage(storage.clone());
        let token = token(&state);
        let app = profile_routes()
            .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
            .with_state(state);

        let resp = app
            .oneshot(put_profile(token, file_body("me.gif", "image/gif", b"GIF89a")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(storage.keys().is_empty());
    }

    #[tokio::test]
    async fn three_megabyte_picture_reaches_the_update() {
        let storage = Arc::new(MemoryStorage::default());
        let state = AppState::fake_with_storage(storage.clone());
        let token = token(&state);
        let picture = vec![0u8; 3 * 1024 * 1024];

        let resp = build_app(state)
            .oneshot(put_profile(token, file_body("me.png", "image/png", &picture)))
            .await
            .unwrap();
        // parsing succeeded; the unreachable database is what fails,
        // and the stored picture is cleaned up afterwards
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(storage.keys().is_empty());
    }

    #[tokio::test]
    async fn picture_over_the_upload_limit_is_413() {
        let storage = Arc::new(MemoryStorage::default());
        let state = AppState::fake_with_storage(storage.clone());
        let token = token(&state);
        let picture = vec![0u8; UPLOAD_BODY_LIMIT + 1024];

        let resp = build_app(state)
            .oneshot(put_profile(token, file_body("me.png", "image/png", &picture)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(message(resp).await, FILE_TOO_LARGE);
        assert!(storage.keys().is_empty());
    }
}
