use serde::{Deserialize, Serialize};

use super::repo_types::PublicUser;

/// Body of `POST /dashboard/add-user`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Body of `PUT /users/:username`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub new_username: Option<String>,
    pub new_email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPage {
    pub page: i64,
    pub limit: i64,
    pub total_users: i64,
    pub total_pages: i64,
    pub users: Vec<PublicUser>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub message: String,
    pub user: PublicUser,
}
