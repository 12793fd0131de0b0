use chrono::NaiveDate;
use rusqlite::Connection;

use crate::db::queries;
use crate::models::{Booking, BookingStatus};

/// Statuses that make a date range unavailable to a new request. A pending
/// request reserves its dates until the owner decides on it.
pub const CREATION_BLOCKING: &[BookingStatus] = &[BookingStatus::Pending, BookingStatus::Approved];

/// Statuses that stop a pending request from being approved. Other pending
/// requests never block approval; only a confirmed stay does.
pub const APPROVAL_BLOCKING: &[BookingStatus] = &[BookingStatus::Approved];

/// Ranges are half-open: the end date is checkout day, so a stay ending on
/// the 10th and one starting on the 10th share no night.
pub fn ranges_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// First booking on `listing_id` in one of the `blocking` statuses whose
/// dates overlap [start, end). `exclude_booking_id` lets an approval skip
/// the booking being approved.
pub fn find_conflict(
    conn: &Connection,
    listing_id: &str,
    start: NaiveDate,
    end: NaiveDate,
    blocking: &[BookingStatus],
    exclude_booking_id: Option<&str>,
) -> anyhow::Result<Option<Booking>> {
    let bookings = queries::get_listing_bookings_by_status(conn, listing_id, blocking)?;

    for booking in bookings {
        if exclude_booking_id == Some(booking.id.as_str()) {
            continue;
        }
        if ranges_overlap(start, end, booking.start_date, booking.end_date) {
            return Ok(Some(booking));
        }
    }
    Ok(None)
}
