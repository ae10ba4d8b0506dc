use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,             // Argon2 hash, not exposed in JSON
    pub profile_image: Option<String>,
}

/// Public part of the user returned to the client. Never carries the hash.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct PublicUser {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub profile_image: Option<String>,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            profile_image: u.profile_image,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> User {
        User {
            id: 1,
            username: "alice".into(),
            email: "alice@example.com".into(),
            password: "$argon2id$v=19$secret".into(),
            profile_image: Some("1700000000000-1.png".into()),
        }
    }

    #[test]
    fn user_serialization_omits_password() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["username"], "alice");
    }

    #[test]
    fn public_user_has_no_password_field() {
        let json = serde_json::to_string(&PublicUser::from(sample())).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("argon2"));
        assert!(json.contains("profile_image"));
    }
}
