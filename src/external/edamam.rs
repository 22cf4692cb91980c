//! Edamam nutrition-data client.

use super::{NutritionFacts, NutritionProvider};
use crate::errors::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{info, warn};

/// Public Edamam endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.edamam.com";

const SERVICE: &str = "Edamam";

/// Client for `GET /api/nutrition-data`
#[derive(Debug, Clone)]
pub struct EdamamClient {
    http: reqwest::Client,
    base_url: String,
    app_id: String,
    app_key: String,
}

#[derive(Debug, Deserialize)]
struct Quantity {
    quantity: f64,
}

#[derive(Debug, Deserialize)]
struct NutritionData {
    calories: Option<f64>,
    #[serde(rename = "totalNutrients", default)]
    total_nutrients: HashMap<String, Quantity>,
}

impl NutritionData {
    fn into_facts(self) -> Option<NutritionFacts> {
        let calories = self.calories.filter(|c| *c > 0.0)?;
        if self.total_nutrients.is_empty() {
            return None;
        }
        let nutrient = |code: &str| self.total_nutrients.get(code).map(|q| q.quantity);
        Some(NutritionFacts {
            calories,
            proteins: nutrient("PROCNT"),
            fats: nutrient("FAT"),
            carbohydrates: nutrient("CHOCDF"),
        })
    }
}

impl EdamamClient {
    #[must_use]
    pub fn new(app_id: impl Into<String>, app_key: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, app_id, app_key)
    }

    #[must_use]
    pub fn with_base_url(
        base_url: impl Into<String>,
        app_id: impl Into<String>,
        app_key: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            app_id: app_id.into(),
            app_key: app_key.into(),
        }
    }
}

fn upstream(err: &reqwest::Error) -> Error {
    Error::Upstream {
        service: SERVICE,
        message: err.to_string(),
    }
}

#[async_trait]
impl NutritionProvider for EdamamClient {
    async fn nutrition_for(&self, query: &str) -> Result<Option<NutritionFacts>> {
        let ingredient = format!("1 serving {query}");
        let response = self
            .http
            .get(format!("{}/api/nutrition-data", self.base_url))
            .query(&[
                ("app_id", self.app_id.as_str()),
                ("app_key", self.app_key.as_str()),
                ("ingr", ingredient.as_str()),
            ])
            .send()
            .await
            .map_err(|e| upstream(&e))?;

        let status = response.status();
        info!("Edamam responded {status} for '{query}'");
        if !status.is_success() {
            warn!("No nutrition data for '{query}'");
            return Ok(None);
        }
        let data: NutritionData = response.json().await.map_err(|e| upstream(&e))?;
        let facts = data.into_facts();
        if facts.is_none() {
            warn!("No nutrition data for '{query}'");
        }
        Ok(facts)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_parse_nutrition_data() {
        let body = r#"{
            "calories": 420,
            "totalNutrients": {
                "PROCNT": {"label": "Protein", "quantity": 25.5, "unit": "g"},
                "FAT": {"label": "Fat", "quantity": 12.25, "unit": "g"}
            }
        }"#;
        let facts = serde_json::from_str::<NutritionData>(body)
            .unwrap()
            .into_facts()
            .unwrap();
        assert_eq!(facts.calories, 420.0);
        assert_eq!(facts.proteins, Some(25.5));
        assert_eq!(facts.fats, Some(12.25));
        assert_eq!(facts.carbohydrates, None);
    }

    #[test]
    fn test_zero_calories_means_unknown() {
        let body = r#"{"calories": 0, "totalNutrients": {}}"#;
        let data = serde_json::from_str::<NutritionData>(body).unwrap();
        assert!(data.into_facts().is_none());

        let body = r#"{"calories": 120}"#;
        let data = serde_json::from_str::<NutritionData>(body).unwrap();
        assert!(data.into_facts().is_none());
    }
}
