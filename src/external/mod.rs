//! Outbound HTTP services used by the chatbot.
//!
//! Each service sits behind an async trait so the chatbot can be exercised
//! with in-process fakes.

pub mod edamam;
pub mod openai;

use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use edamam::EdamamClient;
pub use openai::OpenAiClient;

/// Nutrition facts for one serving
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NutritionFacts {
    /// Kilocalories
    pub calories: f64,
    /// Grams of protein
    pub proteins: Option<f64>,
    /// Grams of fat
    pub fats: Option<f64>,
    /// Grams of carbohydrates
    pub carbohydrates: Option<f64>,
}

/// Looks up nutrition facts for a free-text food description.
#[async_trait]
pub trait NutritionProvider: Send + Sync {
    /// Returns `Ok(None)` when the service knows nothing about `query`.
    async fn nutrition_for(&self, query: &str) -> Result<Option<NutritionFacts>>;
}

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    Assistant,
    User,
}

/// One message of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A chat completion request
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Produces the assistant's reply to a conversation.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}
