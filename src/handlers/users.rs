use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{User, UserType};
use crate::state::AppState;

// POST /api/users/register
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub user_type: String,
    pub phone: Option<String>,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let username = req.username.trim();
    let email = req.email.trim();

    if username.is_empty() {
        return Err(AppError::Validation(
            "username must not be empty".to_string(),
        ));
    }
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation("a valid email is required".to_string()));
    }
    let user_type = match req.user_type.as_str() {
        "tenant" => UserType::Tenant,
        "landlord" => UserType::Landlord,
        _ => {
            return Err(AppError::Validation(
                "user type must be tenant or landlord".to_string(),
            ))
        }
    };

    let db = state.db.lock().unwrap();
    if queries::username_exists(&db, username)? {
        return Err(AppError::Conflict("username already taken".to_string()));
    }
    if queries::email_exists(&db, email)? {
        return Err(AppError::Conflict("email already registered".to_string()));
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        username: username.to_string(),
        email: email.to_string(),
        user_type,
        phone: req.phone,
        created_at: Utc::now().naive_utc(),
    };
    queries::insert_user(&db, &user)?;
    tracing::info!(user_id = %user.id, user_type = user_type.as_str(), "user registered");

    Ok((StatusCode::CREATED, Json(user)))
}

// GET /api/users/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<User>, AppError> {
    let db = state.db.lock().unwrap();
    let user = auth::resolve_user(&db, &headers)?;
    Ok(Json(user))
}
