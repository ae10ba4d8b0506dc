use anyhow::Context;
use tracing::{info, warn};

use crate::{
    db::{self, is_unique_violation},
    error::{ApiError, ApiResult},
    images::services::{discard_images, save_images, UploadItem},
    state::AppState,
    storage::PROFILE_PREFIX,
    users::{repo_types::User, services::USERNAME_TAKEN},
};

#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub image: Option<UploadItem>,
}

/// Stores the new picture (if any), then swaps the row inside one transaction.
/// The previous picture is removed only after commit, and only best-effort.
pub async fn update_profile(st: &AppState, user_id: i32, update: ProfileUpdate) -> ApiResult<User> {
    let new_image = match update.image {
        Some(item) => save_images(st, PROFILE_PREFIX, vec![item])
            .await?
            .into_iter()
            .next(),
        None => None,
    };

    let result = swap_profile(
        st,
        user_id,
        update.username.as_deref(),
        update.email.as_deref(),
        new_image.as_deref(),
    )
    .await;

    match result {
        Ok((user, old_image)) => {
            if new_image.is_some() {
                if let Some(old) = old_image.filter(|o| Some(o) != new_image.as_ref()) {
                    discard_images(st, PROFILE_PREFIX, &[old]).await;
                }
            }
            info!(user_id, image_changed = new_image.is_some(), "profile updated");
            Ok(user)
        }
        Err(e) => {
            if let Some(name) = new_image {
                warn!(user_id, "profile update failed; removing uploaded image");
                discard_images(st, PROFILE_PREFIX, &[name]).await;
            }
            Err(e)
        }
    }
}

async fn swap_profile(
    st: &AppState,
    user_id: i32,
    username: Option<&str>,
    email: Option<&str>,
    image: Option<&str>,
) -> ApiResult<(User, Option<String>)> {
    let mut tx = db::begin(&st.db).await?;

    let old_image = User::lock_profile_image(&mut tx, user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    let user = User::update_profile(&mut tx, user_id, username, email, image)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::bad_request(USERNAME_TAKEN)
            } else {
                e.into()
            }
        })?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    tx.commit().await.context("commit profile update")?;
    Ok((user, old_image))
}
