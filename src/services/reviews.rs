use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{BookingStatus, Identity, Review};

pub struct CreateReview {
    pub booking_id: String,
    pub rating: i64,
    pub comment: String,
}

pub struct UpdateReview {
    pub rating: i64,
    pub comment: String,
}

/// A review hangs off a booking, so eligibility is a booking question: the
/// author must be the booking's tenant and the stay must be underway or over
/// (approved or completed). One review per booking.
pub fn create_review(
    conn: &Connection,
    identity: &Identity,
    req: &CreateReview,
) -> Result<Review, AppError> {
    validate_rating(req.rating)?;

    let booking = queries::get_booking(conn, &req.booking_id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {}", req.booking_id)))?;

    if booking.tenant_id != identity.user_id {
        return Err(AppError::Forbidden(
            "you can only review your own bookings".to_string(),
        ));
    }
    if !matches!(
        booking.status,
        BookingStatus::Completed | BookingStatus::Approved
    ) {
        return Err(AppError::InvalidState {
            reason: "only completed or approved bookings can be reviewed".to_string(),
            current: booking.status,
        });
    }
    if queries::review_exists_for_booking(conn, &booking.id)? {
        return Err(AppError::Conflict(
            "a review for this booking already exists".to_string(),
        ));
    }

    let now = Utc::now().naive_utc();
    let review = Review {
        id: Uuid::new_v4().to_string(),
        booking_id: booking.id,
        listing_id: booking.listing_id,
        author_id: identity.user_id.clone(),
        rating: req.rating,
        comment: req.comment.clone(),
        created_at: now,
        updated_at: now,
    };
    queries::insert_review(conn, &review)?;
    tracing::info!(review_id = %review.id, listing_id = %review.listing_id, "review created");
    Ok(review)
}

pub fn update_review(
    conn: &Connection,
    identity: &Identity,
    review_id: &str,
    req: &UpdateReview,
) -> Result<Review, AppError> {
    validate_rating(req.rating)?;

    let mut review = queries::get_review(conn, review_id)?
        .ok_or_else(|| AppError::NotFound(format!("review {review_id}")))?;

    if review.author_id != identity.user_id {
        return Err(AppError::Forbidden(
            "you can only edit your own reviews".to_string(),
        ));
    }

    review.rating = req.rating;
    review.comment = req.comment.clone();
    review.updated_at = Utc::now().naive_utc();
    queries::update_review(conn, &review)?;
    Ok(review)
}

pub fn delete_review(
    conn: &Connection,
    identity: &Identity,
    review_id: &str,
) -> Result<(), AppError> {
    let review = queries::get_review(conn, review_id)?
        .ok_or_else(|| AppError::NotFound(format!("review {review_id}")))?;

    if review.author_id != identity.user_id {
        return Err(AppError::Forbidden(
            "you can only delete your own reviews".to_string(),
        ));
    }

    queries::delete_review(conn, review_id)?;
    Ok(())
}

fn validate_rating(rating: i64) -> Result<(), AppError> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::Validation(
            "rating must be between 1 and 5".to_string(),
        ));
    }
    Ok(())
}
