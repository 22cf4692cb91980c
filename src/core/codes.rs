//! Human-friendly order and reservation codes.
//!
//! A code is a prefix, the uppercase initials of the first two words of the
//! customer's name, a dash and four random digits: `TECJP-0427`.

use crate::errors::{Error, Result, is_unique_violation};
use rand::Rng;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait,
    IntoActiveModel, QueryFilter,
};
use tracing::debug;

/// Prefix of order codes
pub const ORDER_CODE_PREFIX: &str = "TEC";
/// Prefix of reservation codes
pub const RESERVATION_CODE_PREFIX: &str = "RES";

const MAX_ATTEMPTS: usize = 25;

/// Uppercase initials of the first two words of `name`.
#[must_use]
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .take(2)
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Builds a random code for `name` with the given prefix.
#[must_use]
pub fn generate_code(prefix: &str, name: &str) -> String {
    let digits: u16 = rand::thread_rng().gen_range(0..10_000);
    format!("{prefix}{}-{digits:04}", initials(name))
}

/// Inserts the row `build` makes from a fresh code.
///
/// Codes already held in `column` are skipped. When a concurrent insert takes
/// the same code first, the unique index rejects ours and a new code is drawn.
///
/// # Errors
/// Returns a conflict error if no free code was found after several attempts.
pub async fn insert_with_code<C, A, F>(
    db: &C,
    column: <A::Entity as EntityTrait>::Column,
    prefix: &str,
    name: &str,
    build: F,
) -> Result<<A::Entity as EntityTrait>::Model>
where
    C: ConnectionTrait,
    A: ActiveModelTrait + ActiveModelBehavior + Send,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
    F: Fn(String) -> A,
{
    for _ in 0..MAX_ATTEMPTS {
        let code = generate_code(prefix, name);
        let taken = <A::Entity as EntityTrait>::find()
            .filter(column.eq(code.clone()))
            .one(db)
            .await?;
        if taken.is_some() {
            continue;
        }
        match build(code).insert(db).await {
            Ok(model) => return Ok(model),
            Err(err) if is_unique_violation(&err) => {
                debug!("Code collision on insert, drawing another {prefix} code");
            }
            Err(err) => return Err(err.into()),
        }
    }
    Err(Error::conflict(format!(
        "could not generate a unique {prefix} code for '{name}'"
    )))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_initials_takes_first_two_words() {
        assert_eq!(initials("juan perez gomez"), "JP");
        assert_eq!(initials("Ana"), "A");
        assert_eq!(initials("  maría   lópez "), "ML");
        assert_eq!(initials(""), "");
    }

    #[test]
    fn test_generate_code_format() {
        let code = generate_code(ORDER_CODE_PREFIX, "Juan Perez");
        assert!(code.starts_with("TECJP-"));
        let digits = code.trim_start_matches("TECJP-");
        assert_eq!(digits.len(), 4);
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_insert_with_code_retries_after_collision() -> Result<()> {
        use crate::entities::{ReservationStatus, reservation};
        use crate::test_utils::*;
        use sea_orm::Set;
        use std::cell::Cell;

        let db = setup_test_db().await?;
        let user = create_test_user(&db, "A00001", "Juan Perez").await?;
        let row = |code: String| reservation::ActiveModel {
            user_id: Set(user.id),
            code: Set(Some(code)),
            status: Set(ReservationStatus::Pending),
            pickup_date: Set(crate::core::menu::today()),
            order_id: Set(None),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };
        row("RESJP-0001".to_string()).insert(&db).await?;

        // The first attempt reuses the stored code, as a concurrent writer would.
        let attempts = Cell::new(0);
        let inserted = insert_with_code::<_, reservation::ActiveModel, _>(
            &db,
            reservation::Column::Code,
            RESERVATION_CODE_PREFIX,
            &user.name,
            |code| {
                attempts.set(attempts.get() + 1);
                if attempts.get() == 1 {
                    row("RESJP-0001".to_string())
                } else {
                    row(code)
                }
            },
        )
        .await?;
        assert_eq!(attempts.get(), 2);
        let code = inserted.code.unwrap();
        assert!(code.starts_with("RESJP-"));
        assert_ne!(code, "RESJP-0001");
        Ok(())
    }
}
