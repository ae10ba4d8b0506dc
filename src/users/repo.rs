use sqlx::PgPool;

use super::repo_types::{PublicUser, User};
use crate::db::Tx;

macro_rules! user_columns {
    () => {
        "id, username, email, password, profile_image"
    };
}

impl User {
    pub async fn find_by_id(db: &PgPool, id: i32) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(concat!("SELECT ", user_columns!(), " FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_username(db: &PgPool, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(concat!(
            "SELECT ", user_columns!(), " FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(db)
        .await
    }

    /// Email is not unique; the oldest account wins.
    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(concat!(
            "SELECT ", user_columns!(), " FROM users WHERE email = $1 ORDER BY id LIMIT 1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await
    }

    /// Id of the user holding `username`, if any. Exact, case-sensitive match.
    pub async fn id_by_username(db: &PgPool, username: &str) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(db)
            .await
    }

    pub async fn create(
        db: &PgPool,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(concat!(
            r#"
            INSERT INTO users (username, email, password)
            VALUES ($1, $2, $3)
            RETURNING "#,
            user_columns!()
        ))
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await
    }

    pub async fn list_page(
        db: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PublicUser>, sqlx::Error> {
        sqlx::query_as::<_, PublicUser>(
            r#"
            SELECT id, username, email, profile_image
            FROM users
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
    }

    pub async fn count(db: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(db)
            .await
    }

    pub async fn rename(
        db: &PgPool,
        username: &str,
        new_username: &str,
        new_email: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(concat!(
            r#"
            UPDATE users SET username = $1, email = $2
            WHERE username = $3
            RETURNING "#,
            user_columns!()
        ))
        .bind(new_username)
        .bind(new_email)
        .bind(username)
        .fetch_optional(db)
        .await
    }

    pub async fn delete_by_username(db: &PgPool, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(concat!(
            "DELETE FROM users WHERE username = $1 RETURNING ", user_columns!()
        ))
        .bind(username)
        .fetch_optional(db)
        .await
    }

    pub async fn set_password(db: &PgPool, id: i32, password_hash: &str) -> Result<bool, sqlx::Error> {
        let res = sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(db)
            .await?;
        Ok(res.rows_affected() == 1)
    }

    /// Locks the row and returns its current image; outer `None` if the user is gone.
    pub async fn lock_profile_image(
        tx: &mut Tx,
        id: i32,
    ) -> Result<Option<Option<String>>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<String>>(
            "SELECT profile_image FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }

    /// `None` arguments keep the stored value.
    pub async fn update_profile(
        tx: &mut Tx,
        id: i32,
        username: Option<&str>,
        email: Option<&str>,
        profile_image: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(concat!(
            r#"
            UPDATE users
               SET username      = COALESCE($1, username),
                   email         = COALESCE($2, email),
                   profile_image = COALESCE($3, profile_image)
             WHERE id = $4
            RETURNING "#,
            user_columns!()
        ))
        .bind(username)
        .bind(email)
        .bind(profile_image)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }
}
