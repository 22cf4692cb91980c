//! Token authentication.
//!
//! Clients send `Authorization: Token <key>` (or `Bearer <key>`). The
//! middleware resolves the key to an active user and stores it in the request
//! extensions as [`CurrentUser`].

use super::{AppState, error::ApiResult};
use crate::{
    core::auth::{self, LoginResponse},
    entities::{Role, user},
    errors::{Error, Result},
};
use axum::{
    Extension, Json,
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;

/// The authenticated caller
#[derive(Debug, Clone)]
pub struct CurrentUser(pub user::Model);

impl CurrentUser {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.0.role == Role::Administrator
    }

    /// Fails with forbidden unless the caller is an administrator.
    pub fn require_admin(&self) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(Error::Forbidden)
        }
    }

    /// Fails with forbidden unless the caller is `user_id` or an administrator.
    pub fn require_self_or_admin(&self, user_id: i64) -> Result<()> {
        if self.is_admin() || self.0.id == user_id {
            Ok(())
        } else {
            Err(Error::Forbidden)
        }
    }

    /// Institutional id to act on: administrators may pick anyone, students
    /// always act on themselves.
    #[must_use]
    pub fn acting_as(&self, requested: &str) -> String {
        if self.is_admin() && !requested.trim().is_empty() {
            requested.trim().to_string()
        } else {
            self.0.institutional_id.clone()
        }
    }
}

fn token_from(headers: &HeaderMap) -> Result<String> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::Unauthorized {
            message: "missing Authorization header".to_string(),
        })?;
    auth::parse_authorization(header)
        .map(str::to_string)
        .ok_or_else(|| Error::Unauthorized {
            message: "invalid Authorization format".to_string(),
        })
}

/// Middleware that rejects requests without a valid token.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> std::result::Result<Response, Error> {
    let key = token_from(request.headers())?;
    let user = auth::user_for_token(&state.db, &key).await?;
    tracing::debug!(user_id = user.id, "Authenticated request");
    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub institutional_id: String,
    #[serde(default)]
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let response = auth::login(&state.db, &body.institutional_id, &body.password).await?;
    Ok(Json(response))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
    headers: HeaderMap,
) -> ApiResult<serde_json::Value> {
    let key = token_from(&headers)?;
    auth::logout(&state.db, &key).await?;
    Ok(Json(serde_json::json!({ "detail": "logged out" })))
}
