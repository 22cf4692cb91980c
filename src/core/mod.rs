//! Core business logic, independent of the HTTP layer.
//!
//! Every function takes a database connection (or an open DB transaction) and
//! returns [`crate::errors::Result`].

pub mod auth;
pub mod cart;
pub mod category;
pub mod chatbot;
pub mod codes;
pub mod feedback;
pub mod item;
pub mod listing;
pub mod menu;
pub mod order;
pub mod payment;
pub mod reservation;
pub mod user;

/// Rounds `value` to `places` decimal digits.
#[must_use]
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}

/// Deserializes a nullable field of a partial update.
///
/// An absent field stays `None` (through `#[serde(default)]`), an explicit
/// `null` becomes `Some(None)`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(4.333_333, 1), 4.3);
        assert_eq!(round_to(5.961_06, 2), 5.96);
        assert_eq!(round_to(12.0, 2), 12.0);
    }

    #[test]
    fn test_nullable_update_field() {
        let update: item::ItemUpdate = serde_json::from_str(r#"{"calories": null}"#).unwrap();
        assert_eq!(update.calories, Some(None));
        assert_eq!(update.description, None);

        let update: item::ItemUpdate = serde_json::from_str(r#"{"calories": 300}"#).unwrap();
        assert_eq!(update.calories, Some(Some(300)));
    }
}
