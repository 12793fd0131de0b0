//! Booking lifecycle: create, approve, reject, cancel, complete.
//!
//! Every function here runs with the caller already holding the connection
//! lock, so a check-then-write sequence cannot interleave with another
//! request. Status writes additionally go through a conditional update that
//! only applies when the row still holds the status we read, so a stale
//! decision surfaces as an error instead of overwriting a settled booking.

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, Identity, Listing};
use crate::services::conflicts;

pub struct CreateBooking {
    pub listing_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

pub fn create_booking(
    conn: &Connection,
    identity: &Identity,
    req: &CreateBooking,
    today: NaiveDate,
) -> Result<Booking, AppError> {
    if !identity.is_tenant() {
        return Err(AppError::Forbidden(
            "only tenants can create bookings".to_string(),
        ));
    }

    let listing = queries::get_listing(conn, &req.listing_id)?
        .ok_or_else(|| AppError::NotFound(format!("listing {}", req.listing_id)))?;
    if !listing.is_active {
        return Err(AppError::Validation(
            "this listing is not available".to_string(),
        ));
    }

    if req.end_date <= req.start_date {
        return Err(AppError::Validation(
            "end date must be after start date".to_string(),
        ));
    }
    if req.start_date < today {
        return Err(AppError::Validation(
            "start date cannot be in the past".to_string(),
        ));
    }

    let conflict = conflicts::find_conflict(
        conn,
        &req.listing_id,
        req.start_date,
        req.end_date,
        conflicts::CREATION_BLOCKING,
        None,
    )?;
    if conflict.is_some() {
        return Err(AppError::Conflict(
            "these dates are not available".to_string(),
        ));
    }

    let booking = Booking {
        id: Uuid::new_v4().to_string(),
        listing_id: req.listing_id.clone(),
        tenant_id: identity.user_id.clone(),
        start_date: req.start_date,
        end_date: req.end_date,
        status: BookingStatus::Pending,
        total_price: total_price(&listing, req.start_date, req.end_date),
        created_at: Utc::now().naive_utc(),
    };
    queries::insert_booking(conn, &booking)?;
    tracing::info!(booking_id = %booking.id, listing_id = %booking.listing_id, "booking created");
    Ok(booking)
}

/// Nightly rate times the number of nights; the half-open range makes that
/// exactly `end - start` days.
fn total_price(listing: &Listing, start: NaiveDate, end: NaiveDate) -> f64 {
    let nights = (end - start).num_days();
    listing.price * nights as f64
}

pub fn approve_booking(
    conn: &Connection,
    identity: &Identity,
    booking_id: &str,
) -> Result<Booking, AppError> {
    let (booking, listing) = load_booking_and_listing(conn, booking_id)?;

    if listing.owner_id != identity.user_id {
        return Err(AppError::Forbidden(
            "only the listing owner can approve bookings".to_string(),
        ));
    }
    if booking.status != BookingStatus::Pending {
        return Err(AppError::InvalidState {
            reason: "only pending bookings can be approved".to_string(),
            current: booking.status,
        });
    }

    let conflict = conflicts::find_conflict(
        conn,
        &booking.listing_id,
        booking.start_date,
        booking.end_date,
        conflicts::APPROVAL_BLOCKING,
        Some(&booking.id),
    )?;
    if conflict.is_some() {
        return Err(AppError::Conflict(
            "an approved booking already covers these dates".to_string(),
        ));
    }

    let booking = transition(conn, booking_id, BookingStatus::Pending, BookingStatus::Approved)?;
    tracing::info!(booking_id = %booking.id, "booking approved");
    Ok(booking)
}

pub fn reject_booking(
    conn: &Connection,
    identity: &Identity,
    booking_id: &str,
) -> Result<Booking, AppError> {
    let (booking, listing) = load_booking_and_listing(conn, booking_id)?;

    if listing.owner_id != identity.user_id {
        return Err(AppError::Forbidden(
            "only the listing owner can reject bookings".to_string(),
        ));
    }
    if booking.status != BookingStatus::Pending {
        return Err(AppError::InvalidState {
            reason: "only pending bookings can be rejected".to_string(),
            current: booking.status,
        });
    }

    let booking = transition(conn, booking_id, BookingStatus::Pending, BookingStatus::Rejected)?;
    tracing::info!(booking_id = %booking.id, "booking rejected");
    Ok(booking)
}

pub fn cancel_booking(
    conn: &Connection,
    identity: &Identity,
    booking_id: &str,
) -> Result<Booking, AppError> {
    let booking = queries::get_booking(conn, booking_id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;

    if booking.tenant_id != identity.user_id {
        return Err(AppError::Forbidden(
            "only the booking's tenant can cancel it".to_string(),
        ));
    }
    if !matches!(
        booking.status,
        BookingStatus::Pending | BookingStatus::Approved
    ) {
        return Err(AppError::InvalidState {
            reason: "booking can no longer be canceled".to_string(),
            current: booking.status,
        });
    }

    let booking = transition(conn, booking_id, booking.status, BookingStatus::Canceled)?;
    tracing::info!(booking_id = %booking.id, "booking canceled");
    Ok(booking)
}

pub fn complete_booking(
    conn: &Connection,
    identity: &Identity,
    booking_id: &str,
    today: NaiveDate,
) -> Result<Booking, AppError> {
    let (booking, listing) = load_booking_and_listing(conn, booking_id)?;

    if listing.owner_id != identity.user_id {
        return Err(AppError::Forbidden(
            "only the listing owner can complete bookings".to_string(),
        ));
    }
    if booking.status != BookingStatus::Approved {
        return Err(AppError::InvalidState {
            reason: "only approved bookings can be completed".to_string(),
            current: booking.status,
        });
    }
    if booking.end_date > today {
        return Err(AppError::InvalidState {
            reason: "booking has not ended yet".to_string(),
            current: booking.status,
        });
    }

    let booking = transition(conn, booking_id, BookingStatus::Approved, BookingStatus::Completed)?;
    tracing::info!(booking_id = %booking.id, "booking completed");
    Ok(booking)
}

fn load_booking_and_listing(
    conn: &Connection,
    booking_id: &str,
) -> Result<(Booking, Listing), AppError> {
    let booking = queries::get_booking(conn, booking_id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;
    let listing = queries::get_listing(conn, &booking.listing_id)?
        .ok_or_else(|| AppError::NotFound(format!("listing {}", booking.listing_id)))?;
    Ok((booking, listing))
}

/// Applies a status change only if the row still holds `expected`, then
/// re-reads the booking. A failed conditional write means someone settled the
/// booking first; report the status they left behind.
fn transition(
    conn: &Connection,
    booking_id: &str,
    expected: BookingStatus,
    new: BookingStatus,
) -> Result<Booking, AppError> {
    let changed = queries::update_booking_status(conn, booking_id, expected, new)?;
    if !changed {
        let current = queries::get_booking(conn, booking_id)?
            .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;
        return Err(AppError::InvalidState {
            reason: format!("booking is no longer {}", expected.as_str()),
            current: current.status,
        });
    }

    queries::get_booking(conn, booking_id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{PropertyType, User, UserType};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn tenant() -> Identity {
        Identity {
            user_id: "tenant-1".to_string(),
            user_type: UserType::Tenant,
        }
    }

    fn other_tenant() -> Identity {
        Identity {
            user_id: "tenant-2".to_string(),
            user_type: UserType::Tenant,
        }
    }

    fn landlord() -> Identity {
        Identity {
            user_id: "landlord-1".to_string(),
            user_type: UserType::Landlord,
        }
    }

    fn other_landlord() -> Identity {
        Identity {
            user_id: "landlord-2".to_string(),
            user_type: UserType::Landlord,
        }
    }

    fn setup_db() -> Connection {
        let conn = db::init_db(":memory:").unwrap();
        let now = Utc::now().naive_utc();

        for (id, username, email, user_type) in [
            ("landlord-1", "maria", "maria@example.com", UserType::Landlord),
            ("landlord-2", "janis", "janis@example.com", UserType::Landlord),
            ("tenant-1", "rita", "rita@example.com", UserType::Tenant),
            ("tenant-2", "tom", "tom@example.com", UserType::Tenant),
        ] {
            let user = User {
                id: id.to_string(),
                username: username.to_string(),
                email: email.to_string(),
                user_type,
                phone: None,
                created_at: now,
            };
            queries::insert_user(&conn, &user).unwrap();
        }

        let listing = Listing {
            id: "listing-1".to_string(),
            title: "Sunny flat".to_string(),
            description: "Two rooms near the park".to_string(),
            location: "12 Oak Street".to_string(),
            city: "Riga".to_string(),
            district: Some("Centrs".to_string()),
            price: 50.0,
            rooms: 2,
            property_type: PropertyType::Apartment,
            is_active: true,
            owner_id: "landlord-1".to_string(),
            created_at: now,
            updated_at: now,
        };
        queries::insert_listing(&conn, &listing).unwrap();

        conn
    }

    fn today() -> NaiveDate {
        d("2025-07-01")
    }

    fn create_req(start: &str, end: &str) -> CreateBooking {
        CreateBooking {
            listing_id: "listing-1".to_string(),
            start_date: d(start),
            end_date: d(end),
        }
    }

    #[test]
    fn test_create_booking_pending_with_price() {
        let conn = setup_db();
        let booking = create_booking(
            &conn,
            &tenant(),
            &create_req("2025-07-10", "2025-07-14"),
            today(),
        )
        .unwrap();

        assert_eq!(booking.status, BookingStatus::Pending);
        // 4 nights at 50.0
        assert_eq!(booking.total_price, 200.0);
        assert_eq!(booking.tenant_id, "tenant-1");
    }

    #[test]
    fn test_create_booking_requires_tenant() {
        let conn = setup_db();
        let err = create_booking(
            &conn,
            &landlord(),
            &create_req("2025-07-10", "2025-07-14"),
            today(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_create_booking_rejects_inverted_dates() {
        let conn = setup_db();
        let err = create_booking(
            &conn,
            &tenant(),
            &create_req("2025-07-14", "2025-07-14"),
            today(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_create_booking_rejects_past_start() {
        let conn = setup_db();
        let err = create_booking(
            &conn,
            &tenant(),
            &create_req("2025-06-20", "2025-07-05"),
            today(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // Nothing was persisted by the failed create
        let rows = queries::get_listing_bookings_by_status(
            &conn,
            "listing-1",
            conflicts::CREATION_BLOCKING,
        )
        .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_create_booking_rejects_inactive_listing() {
        let conn = setup_db();
        queries::set_listing_active(&conn, "listing-1", false).unwrap();

        let err = create_booking(
            &conn,
            &tenant(),
            &create_req("2025-07-10", "2025-07-14"),
            today(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_create_booking_conflicts_with_pending() {
        let conn = setup_db();
        create_booking(
            &conn,
            &tenant(),
            &create_req("2025-07-10", "2025-07-14"),
            today(),
        )
        .unwrap();

        let err = create_booking(
            &conn,
            &other_tenant(),
            &create_req("2025-07-12", "2025-07-16"),
            today(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn test_create_booking_conflicts_with_approved() {
        let conn = setup_db();
        let first = create_booking(
            &conn,
            &tenant(),
            &create_req("2025-07-10", "2025-07-16"),
            today(),
        )
        .unwrap();
        approve_booking(&conn, &landlord(), &first.id).unwrap();

        let err = create_booking(
            &conn,
            &other_tenant(),
            &create_req("2025-07-12", "2025-07-14"),
            today(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn test_create_booking_allows_adjacent_dates() {
        let conn = setup_db();
        create_booking(
            &conn,
            &tenant(),
            &create_req("2025-07-10", "2025-07-14"),
            today(),
        )
        .unwrap();

        // Checkout and check-in on the 14th
        let booking = create_booking(
            &conn,
            &other_tenant(),
            &create_req("2025-07-14", "2025-07-18"),
            today(),
        )
        .unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);
    }

    #[test]
    fn test_create_booking_ignores_rejected_and_canceled() {
        let conn = setup_db();
        let b1 = create_booking(
            &conn,
            &tenant(),
            &create_req("2025-07-10", "2025-07-14"),
            today(),
        )
        .unwrap();
        reject_booking(&conn, &landlord(), &b1.id).unwrap();

        let booking = create_booking(
            &conn,
            &other_tenant(),
            &create_req("2025-07-10", "2025-07-14"),
            today(),
        )
        .unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);
    }

    #[test]
    fn test_approve_booking_happy_path() {
        let conn = setup_db();
        let booking = create_booking(
            &conn,
            &tenant(),
            &create_req("2025-07-10", "2025-07-14"),
            today(),
        )
        .unwrap();

        let approved = approve_booking(&conn, &landlord(), &booking.id).unwrap();
        assert_eq!(approved.status, BookingStatus::Approved);
    }

    #[test]
    fn test_approve_booking_owner_only() {
        let conn = setup_db();
        let booking = create_booking(
            &conn,
            &tenant(),
            &create_req("2025-07-10", "2025-07-14"),
            today(),
        )
        .unwrap();

        let err = approve_booking(&conn, &other_landlord(), &booking.id).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_approve_booking_requires_pending() {
        let conn = setup_db();
        let booking = create_booking(
            &conn,
            &tenant(),
            &create_req("2025-07-10", "2025-07-14"),
            today(),
        )
        .unwrap();
        approve_booking(&conn, &landlord(), &booking.id).unwrap();

        let err = approve_booking(&conn, &landlord(), &booking.id).unwrap_err();
        match err {
            AppError::InvalidState { current, .. } => {
                assert_eq!(current, BookingStatus::Approved);
            }
            other => panic!("expected InvalidState, got {other:?}"),
        }
    }

    #[test]
    fn test_approve_second_overlapping_request_conflicts() {
        let conn = setup_db();
        let first = create_booking(
            &conn,
            &tenant(),
            &create_req("2025-07-10", "2025-07-14"),
            today(),
        )
        .unwrap();
        // Both requests were pending at the same time, so the second one got in
        queries::insert_booking(
            &conn,
            &Booking {
                id: "second".to_string(),
                listing_id: "listing-1".to_string(),
                tenant_id: "tenant-2".to_string(),
                start_date: d("2025-07-12"),
                end_date: d("2025-07-16"),
                status: BookingStatus::Pending,
                total_price: 200.0,
                created_at: Utc::now().naive_utc(),
            },
        )
        .unwrap();

        approve_booking(&conn, &landlord(), &first.id).unwrap();

        let err = approve_booking(&conn, &landlord(), "second").unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // The losing request stays pending; the owner can still reject it
        let second = queries::get_booking(&conn, "second").unwrap().unwrap();
        assert_eq!(second.status, BookingStatus::Pending);
    }

    #[test]
    fn test_reject_booking_happy_path() {
        let conn = setup_db();
        let booking = create_booking(
            &conn,
            &tenant(),
            &create_req("2025-07-10", "2025-07-14"),
            today(),
        )
        .unwrap();

        let rejected = reject_booking(&conn, &landlord(), &booking.id).unwrap();
        assert_eq!(rejected.status, BookingStatus::Rejected);
    }

    #[test]
    fn test_reject_booking_requires_pending() {
        let conn = setup_db();
        let booking = create_booking(
            &conn,
            &tenant(),
            &create_req("2025-07-10", "2025-07-14"),
            today(),
        )
        .unwrap();
        approve_booking(&conn, &landlord(), &booking.id).unwrap();

        let err = reject_booking(&conn, &landlord(), &booking.id).unwrap_err();
        assert!(matches!(err, AppError::InvalidState { .. }));
    }

    #[test]
    fn test_cancel_booking_from_pending_and_approved() {
        let conn = setup_db();
        let b1 = create_booking(
            &conn,
            &tenant(),
            &create_req("2025-07-10", "2025-07-14"),
            today(),
        )
        .unwrap();
        let canceled = cancel_booking(&conn, &tenant(), &b1.id).unwrap();
        assert_eq!(canceled.status, BookingStatus::Canceled);

        let b2 = create_booking(
            &conn,
            &tenant(),
            &create_req("2025-07-10", "2025-07-14"),
            today(),
        )
        .unwrap();
        approve_booking(&conn, &landlord(), &b2.id).unwrap();
        let canceled = cancel_booking(&conn, &tenant(), &b2.id).unwrap();
        assert_eq!(canceled.status, BookingStatus::Canceled);
    }

    #[test]
    fn test_cancel_booking_tenant_only() {
        let conn = setup_db();
        let booking = create_booking(
            &conn,
            &tenant(),
            &create_req("2025-07-10", "2025-07-14"),
            today(),
        )
        .unwrap();

        let err = cancel_booking(&conn, &other_tenant(), &booking.id).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        // The listing owner cannot cancel either; that path is reject
        let err = cancel_booking(&conn, &landlord(), &booking.id).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_cancel_booking_twice_reports_current_status() {
        let conn = setup_db();
        let booking = create_booking(
            &conn,
            &tenant(),
            &create_req("2025-07-10", "2025-07-14"),
            today(),
        )
        .unwrap();
        cancel_booking(&conn, &tenant(), &booking.id).unwrap();

        let err = cancel_booking(&conn, &tenant(), &booking.id).unwrap_err();
        match err {
            AppError::InvalidState { current, .. } => {
                assert_eq!(current, BookingStatus::Canceled);
            }
            other => panic!("expected InvalidState, got {other:?}"),
        }
    }

    #[test]
    fn test_terminal_states_are_immutable() {
        let conn = setup_db();
        let booking = create_booking(
            &conn,
            &tenant(),
            &create_req("2025-07-10", "2025-07-14"),
            today(),
        )
        .unwrap();
        reject_booking(&conn, &landlord(), &booking.id).unwrap();

        assert!(approve_booking(&conn, &landlord(), &booking.id).is_err());
        assert!(reject_booking(&conn, &landlord(), &booking.id).is_err());
        assert!(cancel_booking(&conn, &tenant(), &booking.id).is_err());
        assert!(complete_booking(&conn, &landlord(), &booking.id, d("2025-08-01")).is_err());

        let after = queries::get_booking(&conn, &booking.id).unwrap().unwrap();
        assert_eq!(after.status, BookingStatus::Rejected);
    }

    #[test]
    fn test_complete_booking_after_end_date() {
        let conn = setup_db();
        let booking = create_booking(
            &conn,
            &tenant(),
            &create_req("2025-07-10", "2025-07-14"),
            today(),
        )
        .unwrap();
        approve_booking(&conn, &landlord(), &booking.id).unwrap();

        let err = complete_booking(&conn, &landlord(), &booking.id, d("2025-07-12")).unwrap_err();
        match err {
            AppError::InvalidState { current, .. } => {
                assert_eq!(current, BookingStatus::Approved);
            }
            other => panic!("expected InvalidState, got {other:?}"),
        }

        let done = complete_booking(&conn, &landlord(), &booking.id, d("2025-07-14")).unwrap();
        assert_eq!(done.status, BookingStatus::Completed);
    }

    #[test]
    fn test_complete_booking_requires_approved() {
        let conn = setup_db();
        let booking = create_booking(
            &conn,
            &tenant(),
            &create_req("2025-07-10", "2025-07-14"),
            today(),
        )
        .unwrap();

        let err = complete_booking(&conn, &landlord(), &booking.id, d("2025-08-01")).unwrap_err();
        assert!(matches!(err, AppError::InvalidState { .. }));
    }

    #[test]
    fn test_conditional_status_update_rejects_stale_expectation() {
        let conn = setup_db();
        let booking = create_booking(
            &conn,
            &tenant(),
            &create_req("2025-07-10", "2025-07-14"),
            today(),
        )
        .unwrap();

        // Row is pending, so an update expecting approved must not apply
        let changed = queries::update_booking_status(
            &conn,
            &booking.id,
            BookingStatus::Approved,
            BookingStatus::Completed,
        )
        .unwrap();
        assert!(!changed);

        let after = queries::get_booking(&conn, &booking.id).unwrap().unwrap();
        assert_eq!(after.status, BookingStatus::Pending);
    }

    #[test]
    fn test_transition_reports_interleaved_settlement() {
        let conn = setup_db();
        let booking = create_booking(
            &conn,
            &tenant(),
            &create_req("2025-07-10", "2025-07-14"),
            today(),
        )
        .unwrap();

        // Another actor settles the booking between read and write
        queries::update_booking_status(
            &conn,
            &booking.id,
            BookingStatus::Pending,
            BookingStatus::Canceled,
        )
        .unwrap();

        let err = transition(
            &conn,
            &booking.id,
            BookingStatus::Pending,
            BookingStatus::Approved,
        )
        .unwrap_err();
        match err {
            AppError::InvalidState { current, .. } => {
                assert_eq!(current, BookingStatus::Canceled);
            }
            other => panic!("expected InvalidState, got {other:?}"),
        }
    }
}
