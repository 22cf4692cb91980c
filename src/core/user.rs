//! User business logic - Accounts, validation and lookups.
//!
//! Users sign in with a 6-character institutional id. Emails must belong to the
//! institution's domain. Passwords are stored as Argon2 hashes (see
//! [`crate::core::auth`]).

use crate::{
    config::settings::BootstrapAdmin,
    core::{
        auth,
        listing::{self, ListParams, Page},
    },
    entities::{Role, User, user},
    errors::{Error, Result},
};
use sea_orm::{Condition, IntoActiveModel, PaginatorTrait, QueryOrder, Set, prelude::*};
use serde::Deserialize;
use tracing::info;

/// Required length of an institutional id
pub const INSTITUTIONAL_ID_LEN: usize = 6;
/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 8;

/// Data needed to register a user
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    /// Six-character institutional id
    pub institutional_id: String,
    /// Full name
    pub name: String,
    /// Institutional email
    pub email: String,
    /// Plain-text password
    pub password: String,
    /// Role, defaults to student
    #[serde(default = "default_role")]
    pub role: Role,
}

const fn default_role() -> Role {
    Role::Student
}

/// Partial update of a user; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    /// New name
    pub name: Option<String>,
    /// New email
    pub email: Option<String>,
    /// New role
    pub role: Option<Role>,
    /// Enable or disable the account
    pub is_active: Option<bool>,
    /// New password
    pub password: Option<String>,
}

/// Filters accepted by [`list_users`]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    /// Exact institutional id
    pub institutional_id: Option<String>,
    /// Role
    pub role: Option<Role>,
}

/// Checks that an institutional id has exactly [`INSTITUTIONAL_ID_LEN`] characters.
pub fn validate_institutional_id(institutional_id: &str) -> Result<()> {
    if institutional_id.chars().count() == INSTITUTIONAL_ID_LEN
        && institutional_id.chars().all(char::is_alphanumeric)
    {
        Ok(())
    } else {
        Err(Error::validation(
            "institutional_id",
            format!("must be exactly {INSTITUTIONAL_ID_LEN} alphanumeric characters"),
        ))
    }
}

/// Checks that `email` is a plain address in `domain`.
pub fn validate_email(email: &str, domain: &str) -> Result<()> {
    let invalid = || Error::validation("email", format!("must be an address in @{domain}"));
    let (local, host) = email.split_once('@').ok_or_else(invalid)?;
    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '+' | '-'));
    if local_ok && host.eq_ignore_ascii_case(domain) {
        Ok(())
    } else {
        Err(invalid())
    }
}

fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::validation(
            "password",
            format!("must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("name", "cannot be empty"));
    }
    Ok(name.to_string())
}

async fn ensure_email_free(db: &DatabaseConnection, email: &str, except: Option<i64>) -> Result<()> {
    let mut query = User::find().filter(user::Column::Email.eq(email));
    if let Some(id) = except {
        query = query.filter(user::Column::Id.ne(id));
    }
    if query.count(db).await? > 0 {
        return Err(Error::conflict(format!("email '{email}' is already registered")));
    }
    Ok(())
}

/// Registers a new user after validating every field.
///
/// # Errors
/// Returns a validation error for malformed input and a conflict error when the
/// institutional id or email is already taken.
pub async fn create_user(
    db: &DatabaseConnection,
    input: NewUser,
    email_domain: &str,
) -> Result<user::Model> {
    let institutional_id = input.institutional_id.trim().to_string();
    validate_institutional_id(&institutional_id)?;
    let name = validate_name(&input.name)?;
    let email = input.email.trim().to_lowercase();
    validate_email(&email, email_domain)?;
    validate_password(&input.password)?;

    if get_user_by_institutional_id(db, &institutional_id)
        .await?
        .is_some()
    {
        return Err(Error::conflict(format!(
            "institutional id '{institutional_id}' is already registered"
        )));
    }
    ensure_email_free(db, &email, None).await?;

    let user = user::ActiveModel {
        institutional_id: Set(institutional_id),
        name: Set(name),
        email: Set(email),
        role: Set(input.role),
        password_hash: Set(auth::hash_password(&input.password)?),
        is_active: Set(true),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    user.insert(db).await.map_err(Into::into)
}

/// Finds a user by primary key.
pub async fn get_user_by_id(db: &DatabaseConnection, user_id: i64) -> Result<Option<user::Model>> {
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Finds a user by institutional id.
pub async fn get_user_by_institutional_id<C>(
    db: &C,
    institutional_id: &str,
) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find()
        .filter(user::Column::InstitutionalId.eq(institutional_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Like [`get_user_by_institutional_id`] but fails when the user does not exist.
pub async fn require_user_by_institutional_id<C>(db: &C, institutional_id: &str) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    get_user_by_institutional_id(db, institutional_id)
        .await?
        .ok_or_else(|| Error::not_found("user", institutional_id))
}

/// Lists users, searching name and email; ordered by name unless asked otherwise.
pub async fn list_users(
    db: &DatabaseConnection,
    filter: &UserFilter,
    params: &ListParams,
) -> Result<Page<user::Model>> {
    let mut query = User::find();
    if let Some(institutional_id) = &filter.institutional_id {
        query = query.filter(user::Column::InstitutionalId.eq(institutional_id.as_str()));
    }
    if let Some(role) = filter.role {
        query = query.filter(user::Column::Role.eq(role));
    }
    if let Some(term) = params.search_term() {
        query = query.filter(
            Condition::any()
                .add(user::Column::Name.contains(term))
                .add(user::Column::Email.contains(term)),
        );
    }
    query = match params.ordering(&["name", "email"])? {
        Some(("email", order)) => query.order_by(user::Column::Email, order),
        Some((_, order)) => query.order_by(user::Column::Name, order),
        None => query.order_by_asc(user::Column::Name),
    };
    listing::paginate(db, query, params).await
}

/// Applies a partial update to a user.
pub async fn update_user(
    db: &DatabaseConnection,
    user_id: i64,
    update: UserUpdate,
    email_domain: &str,
) -> Result<user::Model> {
    let existing = get_user_by_id(db, user_id)
        .await?
        .ok_or_else(|| Error::not_found("user", user_id))?;
    let mut active = existing.into_active_model();

    if let Some(name) = update.name {
        active.name = Set(validate_name(&name)?);
    }
    if let Some(email) = update.email {
        let email = email.trim().to_lowercase();
        validate_email(&email, email_domain)?;
        ensure_email_free(db, &email, Some(user_id)).await?;
        active.email = Set(email);
    }
    if let Some(role) = update.role {
        active.role = Set(role);
    }
    if let Some(is_active) = update.is_active {
        active.is_active = Set(is_active);
    }
    if let Some(password) = update.password {
        validate_password(&password)?;
        active.password_hash = Set(auth::hash_password(&password)?);
    }

    active.update(db).await.map_err(Into::into)
}

/// Deletes a user and, through cascades, everything they own.
pub async fn delete_user(db: &DatabaseConnection, user_id: i64) -> Result<()> {
    let result = User::delete_by_id(user_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("user", user_id));
    }
    Ok(())
}

/// Creates the configured administrator when the user table is empty.
///
/// Returns the new administrator, or `None` when users already exist.
pub async fn bootstrap_admin(
    db: &DatabaseConnection,
    admin: &BootstrapAdmin,
    email_domain: &str,
) -> Result<Option<user::Model>> {
    if User::find().count(db).await? > 0 {
        return Ok(None);
    }
    let created = create_user(
        db,
        NewUser {
            institutional_id: admin.institutional_id.clone(),
            name: admin.name.clone(),
            email: admin.email.clone(),
            password: admin.password.clone(),
            role: Role::Administrator,
        },
        email_domain,
    )
    .await?;
    info!(institutional_id = %created.institutional_id, "Bootstrapped administrator account");
    Ok(Some(created))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_validate_institutional_id() {
        assert!(validate_institutional_id("A12345").is_ok());
        assert!(validate_institutional_id("12345").is_err());
        assert!(validate_institutional_id("1234567").is_err());
        assert!(validate_institutional_id("12 345").is_err());
    }

    #[test]
    fn test_validate_email_domain() {
        assert!(validate_email("juan.perez@tecsup.edu.pe", TEST_DOMAIN).is_ok());
        assert!(validate_email("juan@gmail.com", TEST_DOMAIN).is_err());
        assert!(validate_email("@tecsup.edu.pe", TEST_DOMAIN).is_err());
        assert!(validate_email("juan perez@tecsup.edu.pe", TEST_DOMAIN).is_err());
        assert!(validate_email("no-at-sign", TEST_DOMAIN).is_err());
    }

    #[tokio::test]
    async fn test_create_user_validation() -> Result<()> {
        let db = setup_test_db().await?;

        let mut input = new_user_input("A00001", "Juan Perez");
        input.email = "juan@gmail.com".to_string();
        let result = create_user(&db, input, TEST_DOMAIN).await;
        assert!(matches!(result, Err(Error::Validation { field: "email", .. })));

        let mut input = new_user_input("A00001", "Juan Perez");
        input.password = "short".to_string();
        let result = create_user(&db, input, TEST_DOMAIN).await;
        assert!(matches!(result, Err(Error::Validation { field: "password", .. })));

        let input = new_user_input("A00001", "   ");
        let result = create_user(&db, input, TEST_DOMAIN).await;
        assert!(matches!(result, Err(Error::Validation { field: "name", .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_user_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "A00001", "Juan Perez").await?;

        assert_eq!(user.institutional_id, "A00001");
        assert_eq!(user.role, Role::Student);
        assert!(user.is_active);
        assert_ne!(user.password_hash, TEST_PASSWORD);

        let found = get_user_by_institutional_id(&db, "A00001").await?;
        assert_eq!(found.unwrap().id, user.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_user_duplicates_conflict() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "A00001", "Juan Perez").await?;

        let result = create_user(&db, new_user_input("A00001", "Otro Nombre"), TEST_DOMAIN).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));

        let mut input = new_user_input("A00002", "Juan Perez");
        input.email = "a00001@tecsup.edu.pe".to_string();
        let result = create_user(&db, input, TEST_DOMAIN).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_users_search_and_order() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "A00001", "Carla Diaz").await?;
        create_test_user(&db, "A00002", "Bruno Rojas").await?;
        create_test_admin(&db, "A00003", "Ana Torres").await?;

        let page = list_users(&db, &UserFilter::default(), &ListParams::default()).await?;
        let names: Vec<_> = page.results.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Ana Torres", "Bruno Rojas", "Carla Diaz"]);

        let params = ListParams {
            search: Some("rojas".to_string()),
            ..ListParams::default()
        };
        let page = list_users(&db, &UserFilter::default(), &params).await?;
        assert_eq!(page.count, 1);

        let filter = UserFilter {
            role: Some(Role::Administrator),
            ..UserFilter::default()
        };
        let page = list_users(&db, &filter, &ListParams::default()).await?;
        assert_eq!(page.results[0].name, "Ana Torres");
        Ok(())
    }

    #[tokio::test]
    async fn test_update_user_partial() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "A00001", "Juan Perez").await?;

        let updated = update_user(
            &db,
            user.id,
            UserUpdate {
                name: Some("Juan P. Perez".to_string()),
                is_active: Some(false),
                ..UserUpdate::default()
            },
            TEST_DOMAIN,
        )
        .await?;
        assert_eq!(updated.name, "Juan P. Perez");
        assert!(!updated.is_active);
        assert_eq!(updated.email, user.email);
        Ok(())
    }

    #[tokio::test]
    async fn test_bootstrap_admin_only_on_empty_table() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = BootstrapAdmin {
            institutional_id: "ADM001".to_string(),
            name: "Admin Cafeteria".to_string(),
            email: "admin@tecsup.edu.pe".to_string(),
            password: "supersecret".to_string(),
        };

        let created = bootstrap_admin(&db, &admin, TEST_DOMAIN).await?;
        assert_eq!(created.unwrap().role, Role::Administrator);
        assert!(bootstrap_admin(&db, &admin, TEST_DOMAIN).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_missing_user() -> Result<()> {
        let db = setup_test_db().await?;
        assert!(matches!(
            delete_user(&db, 42).await,
            Err(Error::NotFound { entity: "user", .. })
        ));
        Ok(())
    }
}
