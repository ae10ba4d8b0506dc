use tracing::{info, warn};

use super::repo_types::User;
use crate::{
    auth::password::hash_password_blocking,
    db::is_unique_violation,
    error::{ApiError, ApiResult},
    extract::all_required,
    state::AppState,
};

pub const FIELDS_REQUIRED: &str = "All fields are required";
pub const USERNAME_TAKEN: &str = "Username already exists";

/// Validated registration input shared by `/register` and `/dashboard/add-user`.
#[derive(Debug)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl NewAccount {
    pub fn parse(
        username: Option<String>,
        email: Option<String>,
        password: Option<String>,
    ) -> ApiResult<Self> {
        let [username, email, password] = all_required([username, email, password])
            .ok_or_else(|| ApiError::bad_request(FIELDS_REQUIRED))?;
        Ok(Self {
            username,
            email,
            password,
        })
    }
}

pub async fn create_account(st: &AppState, account: NewAccount) -> ApiResult<User> {
    if User::id_by_username(&st.db, &account.username).await?.is_some() {
        warn!(username = %account.username, "username already registered");
        return Err(ApiError::bad_request(USERNAME_TAKEN));
    }

    let hash = hash_password_blocking(account.password).await?;

    // a concurrent insert can still win the race; the unique index settles it
    let user = User::create(&st.db, &account.username, &account.email, &hash)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::bad_request(USERNAME_TAKEN)
            } else {
                e.into()
            }
        })?;

    info!(user_id = user.id, username = %user.username, "account created");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_requires_every_field() {
        let err = NewAccount::parse(Some("bob".into()), None, Some("pw".into())).unwrap_err();
        assert_eq!(err.to_string(), FIELDS_REQUIRED);

        let err = NewAccount::parse(Some(String::new()), Some("e".into()), Some("pw".into()))
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let ok = NewAccount::parse(Some("bob".into()), Some("b@x.io".into()), Some("pw".into()))
            .unwrap();
        assert_eq!(ok.username, "bob");
    }
}
