//! `POST /chatbot/`

use super::{AppState, auth::CurrentUser, error::ApiResult};
use crate::{
    core::{chatbot, menu},
    errors::Error,
};
use axum::{Extension, Json, extract::State};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ChatbotRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatbotResponse {
    pub response: String,
}

pub async fn chat(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<ChatbotRequest>,
) -> ApiResult<ChatbotResponse> {
    if body.message.trim().is_empty() {
        return Err(Error::validation("message", "no message was provided"));
    }
    let missing = state.config.missing_chatbot_keys();
    let services = match (&state.chat, missing.is_empty()) {
        (Some(services), true) => services,
        _ => return Err(Error::MissingApiKeys { keys: missing }),
    };

    tracing::info!(user_id = current.0.id, "Chatbot question");
    let response = chatbot::respond(
        &state.db,
        services.nutrition.as_ref(),
        services.llm.as_ref(),
        &state.config.openai_model,
        &body.message,
        menu::today(),
    )
    .await?;
    Ok(Json(ChatbotResponse { response }))
}
