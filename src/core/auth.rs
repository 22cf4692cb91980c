//! Authentication - password hashing and API tokens.
//!
//! Clients log in with institutional id and password and receive an opaque
//! token, sent back as `Authorization: Token <key>` (`Bearer` is accepted too).
//! A user holds at most one token; logging in again returns the same one.

use crate::{
    core::user as users,
    entities::{AuthToken, Role, User, auth_token, user},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*};
use serde::Serialize;
use tracing::{debug, instrument};

/// Hashes a password into an Argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String> {
    use argon2::password_hash::SaltString;
    use argon2::password_hash::rand_core::OsRng;
    use argon2::{Argon2, PasswordHasher};
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Checks a password against a stored hash. Malformed hashes never match.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Extracts the token key from an `Authorization` header value.
#[must_use]
pub fn parse_authorization(header: &str) -> Option<&str> {
    let (scheme, key) = header.trim().split_once(' ')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    (scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer")).then_some(key)
}

/// Successful login
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    /// Token to send in the `Authorization` header
    pub token: String,
    /// Role of the user
    pub role: Role,
    /// Display name of the user
    pub name: String,
}

/// Verifies credentials and returns the user's token, issuing one if needed.
///
/// # Errors
/// * validation error when a credential is missing or the password is wrong
/// * not found when no user has this institutional id
/// * unauthorized when the account is disabled
#[instrument(skip(db, password))]
pub async fn login(
    db: &DatabaseConnection,
    institutional_id: &str,
    password: &str,
) -> Result<LoginResponse> {
    if institutional_id.trim().is_empty() || password.is_empty() {
        return Err(Error::validation(
            "credentials",
            "institutional_id and password are required",
        ));
    }

    let user = users::require_user_by_institutional_id(db, institutional_id.trim()).await?;
    if !verify_password(password, &user.password_hash) {
        return Err(Error::validation("password", "incorrect password"));
    }
    if !user.is_active {
        return Err(Error::Unauthorized {
            message: "account is disabled".to_string(),
        });
    }

    let token = get_or_create_token(db, user.id).await?;
    debug!(user_id = user.id, "Issued API token");
    Ok(LoginResponse {
        token: token.key,
        role: user.role,
        name: user.name,
    })
}

/// Returns the user's token, creating it on first login.
pub async fn get_or_create_token(db: &DatabaseConnection, user_id: i64) -> Result<auth_token::Model> {
    if let Some(existing) = AuthToken::find()
        .filter(auth_token::Column::UserId.eq(user_id))
        .one(db)
        .await?
    {
        return Ok(existing);
    }

    let token = auth_token::ActiveModel {
        key: Set(uuid::Uuid::new_v4().simple().to_string()),
        user_id: Set(user_id),
        created_at: Set(chrono::Utc::now()),
    };
    token.insert(db).await.map_err(Into::into)
}

/// Resolves a token key to an active user.
///
/// # Errors
/// Returns unauthorized when the token is unknown or the user is disabled.
pub async fn user_for_token(db: &DatabaseConnection, key: &str) -> Result<user::Model> {
    let unauthorized = |message: &str| Error::Unauthorized {
        message: message.to_string(),
    };

    let token = AuthToken::find_by_id(key.to_string())
        .one(db)
        .await?
        .ok_or_else(|| unauthorized("invalid token"))?;
    let user = User::find_by_id(token.user_id)
        .one(db)
        .await?
        .ok_or_else(|| unauthorized("invalid token"))?;
    if !user.is_active {
        return Err(unauthorized("account is disabled"));
    }
    Ok(user)
}

/// Deletes a token so it can no longer be used.
pub async fn logout(db: &DatabaseConnection, key: &str) -> Result<()> {
    AuthToken::delete_by_id(key.to_string()).exec(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-phc-string"));
    }

    #[test]
    fn test_parse_authorization() {
        assert_eq!(parse_authorization("Token abc123"), Some("abc123"));
        assert_eq!(parse_authorization("Bearer abc123"), Some("abc123"));
        assert_eq!(parse_authorization("token  abc123 "), Some("abc123"));
        assert_eq!(parse_authorization("Basic abc123"), None);
        assert_eq!(parse_authorization("Token"), None);
    }

    #[tokio::test]
    async fn test_login_issues_stable_token() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "A00001", "Juan Perez").await?;

        let first = login(&db, "A00001", TEST_PASSWORD).await?;
        let second = login(&db, "A00001", TEST_PASSWORD).await?;
        assert_eq!(first.token, second.token);
        assert_eq!(first.name, "Juan Perez");
        assert_eq!(first.role, Role::Student);

        let resolved = user_for_token(&db, &first.token).await?;
        assert_eq!(resolved.id, user.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_login_failures() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "A00001", "Juan Perez").await?;

        assert!(matches!(
            login(&db, "", TEST_PASSWORD).await,
            Err(Error::Validation { field: "credentials", .. })
        ));
        assert!(matches!(
            login(&db, "Z99999", TEST_PASSWORD).await,
            Err(Error::NotFound { entity: "user", .. })
        ));
        assert!(matches!(
            login(&db, "A00001", "wrong-password").await,
            Err(Error::Validation { field: "password", .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_logout_revokes_token() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "A00001", "Juan Perez").await?;
        let session = login(&db, "A00001", TEST_PASSWORD).await?;

        logout(&db, &session.token).await?;
        assert!(matches!(
            user_for_token(&db, &session.token).await,
            Err(Error::Unauthorized { .. })
        ));
        Ok(())
    }
}
