//! Chatbot - Answers questions about the available dishes.
//!
//! The answer is built from the available items, their ratings and nutrition
//! facts looked up per dish. Requests for a calorie table are answered
//! directly with a Markdown table; everything else goes to the chat model
//! with the dish data as context.

use crate::{
    core::feedback,
    entities::{Category, category},
    errors::{Error, Result},
    external::{ChatCompletion, ChatMessage, ChatRequest, ChatRole, NutritionProvider},
};
use chrono::NaiveDate;
use sea_orm::{DatabaseConnection, prelude::*};
use std::collections::HashMap;
use std::fmt::Write as _;
use tracing::{info, warn};

/// Placeholder for missing values
pub const NOT_AVAILABLE: &str = "Not available";

const MAX_TOKENS: u32 = 700;
const TEMPERATURE: f32 = 0.7;

const SYSTEM_PROMPT: &str = "You are an expert culinary assistant helping university students \
with detailed information about the dishes available at the cafeteria. Organise the data \
clearly using Markdown: numbered lists, headings, tables when useful and bullet lists for \
extra details. Show ratings with stars (★) and include nutrition facts when available. \
If some information is missing, say so plainly.";

const CALORIE_TABLE_KEYWORDS: [&str; 6] = [
    "tabla calórica",
    "tabla calorica",
    "tabla de calorías",
    "tabla de calorias",
    "calorie table",
    "calories table",
];

/// Dish names the nutrition service does not recognise, with descriptions it does.
const DISH_DESCRIPTIONS: [(&str, &str); 20] = [
    ("causa", "mashed potato with tuna"),
    ("arroz con leche", "rice pudding"),
    ("gelatina", "gelatin dessert"),
    ("flan", "custard"),
    ("pan con pato", "duck sandwich"),
    ("pan con queso", "cheese sandwich"),
    ("chicharron de pollo", "fried chicken"),
    ("galletas", "cookies"),
    ("ceviche", "ceviche (raw fish marinated in citrus)"),
    (
        "lomo saltado",
        "stir-fried beef with onions, tomatoes, and French fries",
    ),
    ("aji de gallina", "chicken in a spicy, creamy sauce"),
    ("papas a la huancaina", "potatoes with spicy cheese sauce"),
    ("tamales", "steamed corn dough with meat or vegetables"),
    ("tacu tacu", "rice and beans fried together"),
    ("anticuchos", "grilled skewers, often with beef heart"),
    (
        "causa rellena",
        "layered potato dish filled with tuna or chicken",
    ),
    ("sopa seca", "Peruvian dry spaghetti with a flavorful sauce"),
    ("mote con hueso", "hominy corn with pork"),
    (
        "pisco sour",
        "cocktail made with pisco, lemon, egg white, and bitters",
    ),
    ("inca kola", "popular Peruvian soft drink (yellow soda)"),
];

/// Description of a dish understood by the nutrition service.
///
/// Falls back to the dish name itself.
#[must_use]
pub fn nutrition_query_for(dish: &str) -> String {
    let key = dish.trim().to_lowercase();
    DISH_DESCRIPTIONS
        .iter()
        .find(|(name, _)| *name == key)
        .map_or_else(|| dish.to_string(), |(_, description)| (*description).to_string())
}

/// Five-star rendering of an average rating, e.g. `★★★★☆` for 4.3.
#[must_use]
pub fn stars(average: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let filled = average.round().clamp(0.0, 5.0) as usize;
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

/// Whether the message asks for a calorie table.
#[must_use]
pub fn wants_calorie_table(message: &str) -> bool {
    let lower = message.to_lowercase();
    CALORIE_TABLE_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Everything the chatbot knows about one dish
#[derive(Debug, Clone, PartialEq)]
pub struct DishInfo {
    pub name: String,
    pub category: String,
    pub average_rating: f64,
    pub total_votes: u64,
    pub calories: Option<f64>,
    pub proteins: Option<f64>,
    pub fats: Option<f64>,
    pub carbohydrates: Option<f64>,
    pub description: Option<String>,
}

fn grams(value: Option<f64>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |g| format!("{g:.1} g"))
}

impl DishInfo {
    fn calories_text(&self) -> String {
        self.calories
            .map_or_else(|| NOT_AVAILABLE.to_string(), |kcal| format!("{kcal:.0} kcal"))
    }

    fn description_text(&self) -> &str {
        self.description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or("No description")
    }
}

/// Best-rated dish of each category, in order of first appearance.
///
/// Ties keep the dish that came first.
#[must_use]
pub fn best_per_category(dishes: &[DishInfo]) -> Vec<&DishInfo> {
    let mut best: Vec<&DishInfo> = Vec::new();
    for dish in dishes {
        match best.iter_mut().find(|b| b.category == dish.category) {
            Some(slot) => {
                if dish.average_rating > slot.average_rating {
                    *slot = dish;
                }
            }
            None => best.push(dish),
        }
    }
    best
}

/// Markdown calorie table of the dishes named in `message`, or of all dishes
/// when none is named.
#[must_use]
pub fn calorie_table(dishes: &[DishInfo], message: &str) -> String {
    let lower = message.to_lowercase();
    let named: Vec<&DishInfo> = dishes
        .iter()
        .filter(|d| lower.contains(&d.name.to_lowercase()))
        .collect();
    let rows: Vec<&DishInfo> = if named.is_empty() {
        dishes.iter().collect()
    } else {
        named
    };

    let mut table = String::from(
        "### Calorie Table of Available Dishes\n\n\
         | **Dish** | **Calories** | **Proteins** | **Fats** | **Carbohydrates** |\n\
         |----------|-------------:|-------------:|---------:|------------------:|\n",
    );
    for dish in rows {
        let _ = writeln!(
            table,
            "| {} | {} | {} | {} | {} |",
            dish.name,
            dish.calories_text(),
            grams(dish.proteins),
            grams(dish.fats),
            grams(dish.carbohydrates),
        );
    }
    table
}

/// Markdown context handed to the chat model.
#[must_use]
pub fn build_context(dishes: &[DishInfo], date: NaiveDate) -> String {
    let mut context = format!(
        "Current date: {}\n\nAvailable dishes:\n\n",
        date.format("%d/%m/%Y")
    );
    for (idx, dish) in dishes.iter().enumerate() {
        let _ = write!(
            context,
            "### {}. {} ({})\n\n\
             - **Average rating:** {} ({:.1} out of 5)\n\
             - **Total votes:** {}\n\
             - **Calories:** {}\n\
             - **Nutrients:**\n\
             \x20   - Proteins: {}\n\
             \x20   - Fats: {}\n\
             \x20   - Carbohydrates: {}\n\
             - **Description:** {}\n\n",
            idx + 1,
            dish.name,
            dish.category,
            stars(dish.average_rating),
            dish.average_rating,
            dish.total_votes,
            dish.calories_text(),
            grams(dish.proteins),
            grams(dish.fats),
            grams(dish.carbohydrates),
            dish.description_text(),
        );
    }
    context.push_str("\nBest dishes per category:\n");
    for dish in best_per_category(dishes) {
        let _ = writeln!(
            context,
            "- **{}:** {} with an average rating of {} ({:.1} out of 5)",
            dish.category,
            dish.name,
            stars(dish.average_rating),
            dish.average_rating,
        );
    }
    context
}

/// Gathers ratings and nutrition facts of every available item.
///
/// Nutrition lookups that fail leave the values unknown.
pub async fn collect_dishes(
    db: &DatabaseConnection,
    nutrition: &dyn NutritionProvider,
) -> Result<Vec<DishInfo>> {
    let available = crate::core::item::available_items(db).await?;
    if available.is_empty() {
        return Err(Error::NoAvailableItems);
    }
    let categories: HashMap<i64, String> = Category::find()
        .filter(category::Column::Id.is_in(available.iter().map(|i| i.category_id)))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();
    let item_ids: Vec<i64> = available.iter().map(|i| i.id).collect();
    let ratings = feedback::rating_summaries(db, &item_ids).await?;

    let mut dishes = Vec::with_capacity(available.len());
    for item in available {
        let query = nutrition_query_for(&item.name);
        let facts = match nutrition.nutrition_for(&query).await {
            Ok(facts) => facts,
            Err(e) => {
                warn!("Nutrition lookup failed for '{query}': {e}");
                None
            }
        };
        let rating = ratings.get(&item.id).copied().unwrap_or_default();
        dishes.push(DishInfo {
            category: categories
                .get(&item.category_id)
                .cloned()
                .unwrap_or_default(),
            average_rating: rating.average_rating,
            total_votes: rating.total_votes,
            calories: facts.map(|f| f.calories),
            proteins: facts.and_then(|f| f.proteins),
            fats: facts.and_then(|f| f.fats),
            carbohydrates: facts.and_then(|f| f.carbohydrates),
            description: item.description,
            name: item.name,
        });
    }
    Ok(dishes)
}

/// Answers a user message.
pub async fn respond(
    db: &DatabaseConnection,
    nutrition: &dyn NutritionProvider,
    llm: &dyn ChatCompletion,
    model: &str,
    message: &str,
    today: NaiveDate,
) -> Result<String> {
    let message = message.trim();
    if message.is_empty() {
        return Err(Error::validation("message", "no message was provided"));
    }
    let dishes = collect_dishes(db, nutrition).await?;

    if wants_calorie_table(message) {
        info!("Answering with a calorie table");
        return Ok(calorie_table(&dishes, message));
    }

    let request = ChatRequest {
        model: model.to_string(),
        messages: vec![
            ChatMessage::new(ChatRole::System, SYSTEM_PROMPT),
            ChatMessage::new(ChatRole::Assistant, build_context(&dishes, today)),
            ChatMessage::new(ChatRole::User, message),
        ],
        max_tokens: MAX_TOKENS,
        temperature: TEMPERATURE,
    };
    let reply = llm.complete(&request).await?;
    info!(dishes = dishes.len(), "Chat completion answered");
    Ok(reply)
}
