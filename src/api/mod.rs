//! HTTP surface of the cafeteria backend.
//!
//! Handlers are thin: they pick what the caller is allowed to do, then hand
//! off to [`crate::core`]. Everything except `/health` and the login endpoint
//! requires a `Token <key>` authorization header.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod chatbot;
pub mod error;
pub mod feedback;
pub mod menus;
pub mod orders;
pub mod reservations;
pub mod users;

pub use error::ApiResult;

use crate::{
    config::AppConfig,
    errors::{Error, Result},
    external::{ChatCompletion, EdamamClient, NutritionProvider, OpenAiClient},
};
use axum::{
    Json, Router,
    extract::State,
    middleware,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Outbound clients used by the chatbot
#[derive(Clone)]
pub struct ChatServices {
    /// Nutrition lookups
    pub nutrition: Arc<dyn NutritionProvider>,
    /// Chat completion
    pub llm: Arc<dyn ChatCompletion>,
}

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: DatabaseConnection,
    /// Runtime settings
    pub config: Arc<AppConfig>,
    /// Present only when every chatbot key is configured
    pub chat: Option<ChatServices>,
}

impl AppState {
    /// Builds the state, creating the chatbot clients when their keys are set.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: Arc<AppConfig>) -> Self {
        let chat = match (
            &config.openai_api_key,
            &config.edamam_app_id,
            &config.edamam_app_key,
        ) {
            (Some(api_key), Some(app_id), Some(app_key)) => Some(ChatServices {
                nutrition: Arc::new(EdamamClient::new(app_id.clone(), app_key.clone())),
                llm: Arc::new(OpenAiClient::new(api_key.clone())),
            }),
            _ => None,
        };
        Self { db, config, chat }
    }

    /// Replaces the chatbot clients.
    #[must_use]
    pub fn with_chat(mut self, chat: ChatServices) -> Self {
        self.chat = Some(chat);
        self
    }

    /// Prefix for absolute image URLs, without a trailing slash
    pub fn base_url(&self) -> &str {
        self.config.public_base_url.trim_end_matches('/')
    }
}

/// Parses a JSON body that may be left out entirely.
pub(crate) fn optional_json<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| Error::validation("body", e.to_string()))
}

async fn health(State(state): State<AppState>) -> ApiResult<serde_json::Value> {
    state.db.ping().await?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

/// Builds the application router.
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/users", get(users::list_users).post(users::create_user))
        .route("/api/users/me", get(users::me))
        .route(
            "/api/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .route(
            "/api/categories",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route(
            "/api/categories/{id}",
            get(catalog::get_category)
                .put(catalog::update_category)
                .patch(catalog::update_category)
                .delete(catalog::delete_category),
        )
        .route(
            "/api/items",
            get(catalog::list_items).post(catalog::create_item),
        )
        .route(
            "/api/items/{id}",
            get(catalog::get_item)
                .put(catalog::update_item)
                .patch(catalog::update_item)
                .delete(catalog::delete_item),
        )
        .route("/api/menus", get(menus::list_menus).post(menus::create_menu))
        .route("/api/menus/today", get(menus::today_menu))
        .route(
            "/api/menus/{id}",
            get(menus::get_menu)
                .put(menus::update_menu)
                .patch(menus::update_menu)
                .delete(menus::delete_menu),
        )
        .route("/api/menus/{id}/assemble", post(menus::assemble_menu))
        .route(
            "/api/menu-items",
            get(menus::list_menu_items).post(menus::create_menu_item),
        )
        .route(
            "/api/menu-items/{id}",
            get(menus::get_menu_item)
                .put(menus::update_menu_item)
                .patch(menus::update_menu_item)
                .delete(menus::delete_menu_item),
        )
        .route(
            "/api/reservations",
            get(reservations::list_reservations).post(reservations::create_reservation),
        )
        .route(
            "/api/reservations/{id}",
            get(reservations::get_reservation)
                .patch(reservations::update_reservation)
                .delete(reservations::delete_reservation),
        )
        .route(
            "/api/reservations/{id}/confirm",
            post(reservations::confirm_reservation),
        )
        .route(
            "/api/reservations/{id}/cancel",
            post(reservations::cancel_reservation),
        )
        .route(
            "/api/orders",
            get(orders::list_orders).post(orders::create_order),
        )
        .route("/api/orders/bulk", post(orders::create_orders_bulk))
        .route(
            "/api/orders/{id}",
            get(orders::get_order)
                .put(orders::update_order)
                .patch(orders::update_order)
                .delete(orders::delete_order),
        )
        .route("/api/payments", get(orders::list_payments))
        .route(
            "/api/payments/{id}",
            get(orders::get_payment)
                .put(orders::update_payment)
                .patch(orders::update_payment)
                .delete(orders::delete_payment),
        )
        .route(
            "/api/feedback",
            get(feedback::list_feedback).post(feedback::create_feedback),
        )
        .route(
            "/api/feedback/{id}",
            get(feedback::get_feedback)
                .put(feedback::update_feedback)
                .patch(feedback::update_feedback)
                .delete(feedback::delete_feedback),
        )
        .route("/api/cart", get(cart::get_cart).delete(cart::clear_cart))
        .route("/api/cart/items", post(cart::add_item))
        .route(
            "/api/cart/items/{item_id}",
            axum::routing::put(cart::set_item_quantity)
                .patch(cart::set_item_quantity)
                .delete(cart::remove_item),
        )
        .route("/api/cart/checkout", post(cart::checkout))
        .route("/chatbot/", post(chatbot::chat))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/api/auth/login", post(auth::login))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
