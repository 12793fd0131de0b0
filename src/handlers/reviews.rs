use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::auth;
use crate::db::queries;
use crate::errors::AppError;
use crate::services::reviews;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ReviewResponse {
    pub id: String,
    pub booking_id: String,
    pub listing_id: String,
    pub listing_title: String,
    pub author_id: String,
    pub author_username: String,
    pub rating: i64,
    pub comment: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<queries::ReviewSummary> for ReviewResponse {
    fn from(summary: queries::ReviewSummary) -> Self {
        let review = summary.review;
        Self {
            id: review.id,
            booking_id: review.booking_id,
            listing_id: review.listing_id,
            listing_title: summary.listing_title,
            author_id: review.author_id,
            author_username: summary.author_username,
            rating: review.rating,
            comment: review.comment,
            created_at: review.created_at,
            updated_at: review.updated_at,
        }
    }
}

fn summary_response(db: &Connection, review_id: &str) -> Result<Json<ReviewResponse>, AppError> {
    let summary = queries::get_review_summary(db, review_id)?
        .ok_or_else(|| AppError::NotFound(format!("review {review_id}")))?;
    Ok(Json(ReviewResponse::from(summary)))
}

// POST /api/reviews
#[derive(Deserialize)]
pub struct CreateReviewRequest {
    pub booking_id: String,
    pub rating: i64,
    pub comment: Option<String>,
}

pub async fn create_review(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ReviewResponse>), AppError> {
    let db = state.db.lock().unwrap();
    let identity = auth::require_identity(&db, &headers)?;

    let review = reviews::create_review(
        &db,
        &identity,
        &reviews::CreateReview {
            booking_id: req.booking_id,
            rating: req.rating,
            comment: req.comment.unwrap_or_default(),
        },
    )?;

    let response = summary_response(&db, &review.id)?;
    Ok((StatusCode::CREATED, response))
}

// GET /api/reviews
pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ReviewResponse>>, AppError> {
    let db = state.db.lock().unwrap();
    let identity = auth::require_identity(&db, &headers)?;

    // Tenants see what they wrote, landlords what their listings received
    let summaries = if identity.is_landlord() {
        queries::list_reviews_for_owner(&db, &identity.user_id)?
    } else {
        queries::list_reviews_for_author(&db, &identity.user_id)?
    };

    Ok(Json(
        summaries.into_iter().map(ReviewResponse::from).collect(),
    ))
}

// GET /api/reviews/:id
pub async fn get_review(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ReviewResponse>, AppError> {
    let db = state.db.lock().unwrap();
    let identity = auth::require_identity(&db, &headers)?;

    let summary = queries::get_review_summary(&db, &id)?
        .ok_or_else(|| AppError::NotFound(format!("review {id}")))?;

    // Visible to its author and the reviewed listing's owner, nobody else
    if summary.review.author_id != identity.user_id
        && summary.listing_owner_id != identity.user_id
    {
        return Err(AppError::NotFound(format!("review {id}")));
    }

    Ok(Json(ReviewResponse::from(summary)))
}

// PUT /api/reviews/:id
#[derive(Deserialize)]
pub struct UpdateReviewRequest {
    pub rating: i64,
    pub comment: Option<String>,
}

pub async fn update_review(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdateReviewRequest>,
) -> Result<Json<ReviewResponse>, AppError> {
    let db = state.db.lock().unwrap();
    let identity = auth::require_identity(&db, &headers)?;

    reviews::update_review(
        &db,
        &identity,
        &id,
        &reviews::UpdateReview {
            rating: req.rating,
            comment: req.comment.unwrap_or_default(),
        },
    )?;

    summary_response(&db, &id)
}

// DELETE /api/reviews/:id
pub async fn delete_review(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = state.db.lock().unwrap();
    let identity = auth::require_identity(&db, &headers)?;

    reviews::delete_review(&db, &identity, &id)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}
