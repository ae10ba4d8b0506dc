use anyhow::Context;
use argon2::{
    password_hash::{
        rand_core::OsRng, Error as HashError, PasswordHash, PasswordHasher, PasswordVerifier,
        SaltString,
    },
    Argon2,
};
use tracing::warn;

fn hash(plain: &[u8]) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain, &salt)
        .map(|h| h.to_string())
        .map_err(|e| anyhow::anyhow!("argon2 hash: {e}"))
}

/// `Ok(false)` only for a genuine mismatch; an unreadable stored hash is an error.
fn matches(plain: &[u8], stored: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| {
        warn!(error = %e, "stored password is not a PHC string");
        anyhow::anyhow!("unreadable password hash: {e}")
    })?;
    match Argon2::default().verify_password(plain, &parsed) {
        Ok(()) => Ok(true),
        Err(HashError::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("argon2 verify: {e}")),
    }
}

/// Argon2 runs on the blocking pool, off the async workers.
pub async fn hash_password_blocking(plain: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || hash(plain.as_bytes()))
        .await
        .context("password hashing task")?
}

pub async fn verify_password_blocking(plain: String, stored: String) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || matches(plain.as_bytes(), &stored))
        .await
        .context("password verification task")?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_hash_is_phc_argon2id() {
        let stored = hash(b"pw-123").unwrap();
        assert!(stored.starts_with("$argon2id$"));
        assert!(!stored.contains("pw-123"));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        assert_ne!(hash(b"same").unwrap(), hash(b"same").unwrap());
    }

    #[test]
    fn mismatch_is_false_not_error() {
        let stored = hash(b"correct-horse").unwrap();
        assert!(matches(b"correct-horse", &stored).unwrap());
        assert!(!matches(b"wrong", &stored).unwrap());
    }

    #[test]
    fn plaintext_in_the_password_column_is_an_error() {
        assert!(matches(b"anything", "not-a-valid-hash").is_err());
    }

    #[tokio::test]
    async fn blocking_wrappers_agree() {
        let stored = hash_password_blocking("pw".into()).await.unwrap();
        assert!(verify_password_blocking("pw".into(), stored.clone()).await.unwrap());
        assert!(!verify_password_blocking("nope".into(), stored).await.unwrap());
    }
}
