//! Feedback and rating business logic.
//!
//! Users rate items from 1 to 5, once per item. Item read models expose three
//! aggregates computed from those ratings:
//!
//! * average rating, rounded to one decimal (0.0 without votes)
//! * total votes
//! * composite score `average × ln(votes + 1)`, rounded to two decimals, which
//!   favours items that are both well rated and frequently rated

use crate::{
    core::{
        listing::{self, ListParams, Page},
        round_to, user as users,
    },
    entities::{Feedback, Item, User, feedback},
    errors::{Error, Result, is_unique_violation},
};
use sea_orm::{IntoActiveModel, QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lowest accepted rating
pub const MIN_RATING: i32 = 1;
/// Highest accepted rating
pub const MAX_RATING: i32 = 5;

/// Aggregated ratings of one item
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct RatingSummary {
    /// Mean rating rounded to one decimal
    pub average_rating: f64,
    /// Number of ratings
    pub total_votes: u64,
    /// `average × ln(votes + 1)` rounded to two decimals
    pub composite_score: f64,
}

impl RatingSummary {
    /// Builds the summary from raw ratings.
    #[must_use]
    pub fn from_ratings(ratings: &[i32]) -> Self {
        if ratings.is_empty() {
            return Self::default();
        }
        let votes = ratings.len() as u64;
        let sum: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
        #[allow(clippy::cast_precision_loss)]
        let average = round_to(sum as f64 / votes as f64, 1);
        Self {
            average_rating: average,
            total_votes: votes,
            composite_score: composite_score(average, votes),
        }
    }
}

/// Composite score for an average rating and a vote count.
#[must_use]
pub fn composite_score(average: f64, votes: u64) -> f64 {
    if votes == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let weight = (votes as f64 + 1.0).ln();
    round_to(average * weight, 2)
}

/// Rejects ratings outside `MIN_RATING..=MAX_RATING`.
pub fn validate_rating(rating: i32) -> Result<()> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(Error::validation(
            "rating",
            format!("must be between {MIN_RATING} and {MAX_RATING}"),
        ))
    }
}

/// Rating summaries for several items at once. Items without feedback are absent.
pub async fn rating_summaries(
    db: &DatabaseConnection,
    item_ids: &[i64],
) -> Result<HashMap<i64, RatingSummary>> {
    if item_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = Feedback::find()
        .filter(feedback::Column::ItemId.is_in(item_ids.iter().copied()))
        .all(db)
        .await?;

    let mut ratings: HashMap<i64, Vec<i32>> = HashMap::new();
    for row in rows {
        if let Some(item_id) = row.item_id {
            ratings.entry(item_id).or_default().push(row.rating);
        }
    }
    Ok(ratings
        .into_iter()
        .map(|(item_id, values)| (item_id, RatingSummary::from_ratings(&values)))
        .collect())
}

/// Rating summary of a single item.
pub async fn rating_summary(db: &DatabaseConnection, item_id: i64) -> Result<RatingSummary> {
    Ok(rating_summaries(db, &[item_id])
        .await?
        .remove(&item_id)
        .unwrap_or_default())
}

/// New feedback entry
#[derive(Debug, Clone, Deserialize)]
pub struct NewFeedback {
    /// Rated item; omit for general feedback
    pub item_id: Option<i64>,
    /// Optional comment
    #[serde(default)]
    pub comment: String,
    /// Rating between 1 and 5
    pub rating: i32,
}

/// Partial update of a feedback entry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedbackUpdate {
    /// New comment
    pub comment: Option<String>,
    /// New rating
    pub rating: Option<i32>,
}

/// Filters accepted by [`list_feedback`]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedbackFilter {
    /// Author's institutional id
    pub user: Option<String>,
    /// Rated item
    pub item_id: Option<i64>,
    /// Exact rating
    pub rating: Option<i32>,
}

/// Feedback with the names of its author and item
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackView {
    /// Stored feedback
    #[serde(flatten)]
    pub feedback: feedback::Model,
    /// Name of the rated item
    pub item_name: Option<String>,
    /// Name of the author
    pub user_name: Option<String>,
}

/// Records a rating. Each user rates an item at most once.
pub async fn create_feedback(
    db: &DatabaseConnection,
    user_id: i64,
    input: NewFeedback,
) -> Result<feedback::Model> {
    validate_rating(input.rating)?;

    if let Some(item_id) = input.item_id {
        Item::find_by_id(item_id)
            .one(db)
            .await?
            .ok_or_else(|| Error::not_found("item", item_id))?;
        let duplicate = Feedback::find()
            .filter(feedback::Column::UserId.eq(user_id))
            .filter(feedback::Column::ItemId.eq(item_id))
            .one(db)
            .await?;
        if duplicate.is_some() {
            return Err(already_rated());
        }
    }

    feedback::ActiveModel {
        user_id: Set(user_id),
        item_id: Set(input.item_id),
        comment: Set(input.comment.trim().to_string()),
        rating: Set(input.rating),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            already_rated()
        } else {
            err.into()
        }
    })
}

fn already_rated() -> Error {
    Error::conflict("the user has already left feedback for this item")
}

/// Finds a feedback entry by id.
pub async fn get_feedback(db: &DatabaseConnection, feedback_id: i64) -> Result<feedback::Model> {
    Feedback::find_by_id(feedback_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("feedback", feedback_id))
}

/// Changes the comment and/or rating of an entry.
pub async fn update_feedback(
    db: &DatabaseConnection,
    feedback_id: i64,
    update: FeedbackUpdate,
) -> Result<feedback::Model> {
    let mut active = get_feedback(db, feedback_id).await?.into_active_model();
    if let Some(rating) = update.rating {
        validate_rating(rating)?;
        active.rating = Set(rating);
    }
    if let Some(comment) = update.comment {
        active.comment = Set(comment.trim().to_string());
    }
    active.update(db).await.map_err(Into::into)
}

/// Deletes a feedback entry.
pub async fn delete_feedback(db: &DatabaseConnection, feedback_id: i64) -> Result<()> {
    let result = Feedback::delete_by_id(feedback_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("feedback", feedback_id));
    }
    Ok(())
}

/// Adds item and author names to feedback rows.
pub async fn to_views(
    db: &DatabaseConnection,
    rows: Vec<feedback::Model>,
) -> Result<Vec<FeedbackView>> {
    let item_ids: Vec<i64> = rows.iter().filter_map(|f| f.item_id).collect();
    let user_ids: Vec<i64> = rows.iter().map(|f| f.user_id).collect();
    let item_names: HashMap<i64, String> = Item::find()
        .filter(crate::entities::item::Column::Id.is_in(item_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|i| (i.id, i.name))
        .collect();
    let user_names: HashMap<i64, String> = User::find()
        .filter(crate::entities::user::Column::Id.is_in(user_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect();

    Ok(rows
        .into_iter()
        .map(|feedback| FeedbackView {
            item_name: feedback.item_id.and_then(|id| item_names.get(&id).cloned()),
            user_name: user_names.get(&feedback.user_id).cloned(),
            feedback,
        })
        .collect())
}

/// Lists feedback, best ratings first unless asked otherwise.
pub async fn list_feedback(
    db: &DatabaseConnection,
    filter: &FeedbackFilter,
    params: &ListParams,
) -> Result<Page<FeedbackView>> {
    let mut query = Feedback::find();
    if let Some(institutional_id) = &filter.user {
        let user = users::require_user_by_institutional_id(db, institutional_id).await?;
        query = query.filter(feedback::Column::UserId.eq(user.id));
    }
    if let Some(item_id) = filter.item_id {
        query = query.filter(feedback::Column::ItemId.eq(item_id));
    }
    if let Some(rating) = filter.rating {
        query = query.filter(feedback::Column::Rating.eq(rating));
    }
    if let Some(term) = params.search_term() {
        query = query.filter(feedback::Column::Comment.contains(term));
    }
    let order = params
        .ordering(&["rating"])?
        .map_or(sea_orm::Order::Desc, |(_, order)| order);
    query = query
        .order_by(feedback::Column::Rating, order)
        .order_by_asc(feedback::Column::Id);

    let mut page = listing::paginate(db, query, params).await?;
    let rows = std::mem::take(&mut page.results);
    let views = to_views(db, rows).await?;
    Ok(page.with_results(views))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_rating_summary_empty() {
        let summary = RatingSummary::from_ratings(&[]);
        assert_eq!(summary.average_rating, 0.0);
        assert_eq!(summary.total_votes, 0);
        assert_eq!(summary.composite_score, 0.0);
    }

    #[test]
    fn test_rating_summary_values() {
        // avg 4.333 -> 4.3; 4.3 * ln(4) = 5.961...
        let summary = RatingSummary::from_ratings(&[5, 4, 4]);
        assert_eq!(summary.average_rating, 4.3);
        assert_eq!(summary.total_votes, 3);
        assert_eq!(summary.composite_score, 5.96);

        // a single 5 scores lower than three 4s
        let single = RatingSummary::from_ratings(&[5]);
        let many = RatingSummary::from_ratings(&[4, 4, 4]);
        assert!(single.composite_score < many.composite_score);
    }

    #[tokio::test]
    async fn test_create_feedback_rating_range() -> Result<()> {
        let db = setup_test_db().await?;
        for rating in [0, 6, -1] {
            let result = create_feedback(
                &db,
                1,
                NewFeedback {
                    item_id: None,
                    comment: String::new(),
                    rating,
                },
            )
            .await;
            assert!(matches!(result, Err(Error::Validation { field: "rating", .. })));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_create_feedback_once_per_item() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, item) = setup_with_item(&db).await?;
        let user = create_test_user(&db, "A00001", "Juan Perez").await?;

        rate_item(&db, user.id, item.id, 4).await?;
        let result = rate_item(&db, user.id, item.id, 5).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_general_feedback_is_not_limited() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "A00001", "Juan Perez").await?;
        for comment in ["Buen servicio", "Faltan mesas"] {
            create_feedback(
                &db,
                user.id,
                NewFeedback {
                    item_id: None,
                    comment: comment.to_string(),
                    rating: 4,
                },
            )
            .await?;
        }
        let page = list_feedback(&db, &FeedbackFilter::default(), &ListParams::default()).await?;
        assert_eq!(page.count, 2);
        assert!(page.results.iter().all(|view| view.item_name.is_none()));
        Ok(())
    }

    #[tokio::test]
    async fn test_rating_summary_from_database() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, item) = setup_with_item(&db).await?;
        let a = create_test_user(&db, "A00001", "Juan Perez").await?;
        let b = create_test_user(&db, "A00002", "Ana Diaz").await?;
        rate_item(&db, a.id, item.id, 5).await?;
        rate_item(&db, b.id, item.id, 3).await?;

        let summary = rating_summary(&db, item.id).await?;
        assert_eq!(summary.average_rating, 4.0);
        assert_eq!(summary.total_votes, 2);
        assert_eq!(summary.composite_score, round_to(4.0 * 3_f64.ln(), 2));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_feedback_orders_by_rating_desc() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, item) = setup_with_item(&db).await?;
        let a = create_test_user(&db, "A00001", "Juan Perez").await?;
        let b = create_test_user(&db, "A00002", "Ana Diaz").await?;
        rate_item(&db, a.id, item.id, 2).await?;
        rate_item(&db, b.id, item.id, 5).await?;

        let page = list_feedback(&db, &FeedbackFilter::default(), &ListParams::default()).await?;
        assert_eq!(page.results[0].feedback.rating, 5);
        assert_eq!(page.results[0].user_name.as_deref(), Some("Ana Diaz"));
        assert_eq!(page.results[0].item_name.as_deref(), Some(item.name.as_str()));

        let filter = FeedbackFilter {
            user: Some("A00001".to_string()),
            ..FeedbackFilter::default()
        };
        let page = list_feedback(&db, &filter, &ListParams::default()).await?;
        assert_eq!(page.count, 1);
        assert_eq!(page.results[0].feedback.rating, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_feedback_validates_rating() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, item) = setup_with_item(&db).await?;
        let user = create_test_user(&db, "A00001", "Juan Perez").await?;
        let entry = rate_item(&db, user.id, item.id, 3).await?;

        let result = update_feedback(
            &db,
            entry.id,
            FeedbackUpdate {
                rating: Some(9),
                ..FeedbackUpdate::default()
            },
        )
        .await;
        assert!(result.is_err());

        let updated = update_feedback(
            &db,
            entry.id,
            FeedbackUpdate {
                rating: Some(4),
                comment: Some("Muy rico".to_string()),
            },
        )
        .await?;
        assert_eq!(updated.rating, 4);
        assert_eq!(updated.comment, "Muy rico");
        Ok(())
    }
}
