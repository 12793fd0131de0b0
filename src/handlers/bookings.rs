use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::auth;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::BookingStatus;
use crate::services::lifecycle;
use crate::state::AppState;

#[derive(Serialize)]
pub struct BookingResponse {
    pub id: String,
    pub listing_id: String,
    pub listing_title: String,
    pub tenant_id: String,
    pub tenant_email: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: BookingStatus,
    pub total_price: f64,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

fn booking_response(summary: queries::BookingSummary, today: NaiveDate) -> BookingResponse {
    let booking = summary.booking;
    BookingResponse {
        is_active: booking.is_active(today),
        id: booking.id,
        listing_id: booking.listing_id,
        listing_title: summary.listing_title,
        tenant_id: booking.tenant_id,
        tenant_email: summary.tenant_email,
        start_date: booking.start_date,
        end_date: booking.end_date,
        status: booking.status,
        total_price: booking.total_price,
        created_at: booking.created_at,
    }
}

fn summary_response(db: &Connection, booking_id: &str) -> Result<Json<BookingResponse>, AppError> {
    let summary = queries::get_booking_summary(db, booking_id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;
    Ok(Json(booking_response(summary, Utc::now().date_naive())))
}

// POST /api/bookings
#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub listing_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    // One guard across the availability check and the insert
    let db = state.db.lock().unwrap();
    let identity = auth::require_identity(&db, &headers)?;

    let booking = lifecycle::create_booking(
        &db,
        &identity,
        &lifecycle::CreateBooking {
            listing_id: req.listing_id,
            start_date: req.start_date,
            end_date: req.end_date,
        },
        Utc::now().date_naive(),
    )?;

    let response = summary_response(&db, &booking.id)?;
    Ok((StatusCode::CREATED, response))
}

// GET /api/bookings
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let db = state.db.lock().unwrap();
    let identity = auth::require_identity(&db, &headers)?;

    let summaries = if identity.is_landlord() {
        queries::list_bookings_for_owner(&db, &identity.user_id)?
    } else {
        queries::list_bookings_for_tenant(&db, &identity.user_id)?
    };

    let today = Utc::now().date_naive();
    Ok(Json(
        summaries
            .into_iter()
            .map(|s| booking_response(s, today))
            .collect(),
    ))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let db = state.db.lock().unwrap();
    let identity = auth::require_identity(&db, &headers)?;

    let summary = queries::get_booking_summary(&db, &id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;

    // Only the two parties ever learn the booking exists
    if summary.booking.tenant_id != identity.user_id
        && summary.listing_owner_id != identity.user_id
    {
        return Err(AppError::NotFound(format!("booking {id}")));
    }

    Ok(Json(booking_response(summary, Utc::now().date_naive())))
}

// POST /api/bookings/:id/approve
pub async fn approve_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let db = state.db.lock().unwrap();
    let identity = auth::require_identity(&db, &headers)?;

    lifecycle::approve_booking(&db, &identity, &id)?;
    summary_response(&db, &id)
}

// POST /api/bookings/:id/reject
pub async fn reject_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let db = state.db.lock().unwrap();
    let identity = auth::require_identity(&db, &headers)?;

    lifecycle::reject_booking(&db, &identity, &id)?;
    summary_response(&db, &id)
}

// POST /api/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let db = state.db.lock().unwrap();
    let identity = auth::require_identity(&db, &headers)?;

    lifecycle::cancel_booking(&db, &identity, &id)?;
    summary_response(&db, &id)
}

// POST /api/bookings/:id/complete
pub async fn complete_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let db = state.db.lock().unwrap();
    let identity = auth::require_identity(&db, &headers)?;

    lifecycle::complete_booking(&db, &identity, &id, Utc::now().date_naive())?;
    summary_response(&db, &id)
}
