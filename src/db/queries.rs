use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{Booking, BookingStatus, Listing, PropertyType, Review, User, UserType};

// ── Users ──

pub fn insert_user(conn: &Connection, user: &User) -> anyhow::Result<()> {
    let created_at = user.created_at.format("%Y-%m-%d %H:%M:%S").to_string();

    conn.execute(
        "INSERT INTO users (id, username, email, user_type, phone, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user.id,
            user.username,
            user.email,
            user.user_type.as_str(),
            user.phone,
            created_at,
        ],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: &str) -> anyhow::Result<Option<User>> {
    let result = conn.query_row(
        "SELECT id, username, email, user_type, phone, created_at FROM users WHERE id = ?1",
        params![id],
        |row| Ok(parse_user_row(row)),
    );

    match result {
        Ok(user) => Ok(Some(user?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn username_exists(conn: &Connection, username: &str) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE username = ?1",
        params![username],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn email_exists(conn: &Connection, email: &str) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE email = ?1",
        params![email],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn parse_user_row(row: &rusqlite::Row) -> anyhow::Result<User> {
    let id: String = row.get(0)?;
    let username: String = row.get(1)?;
    let email: String = row.get(2)?;
    let user_type_str: String = row.get(3)?;
    let phone: Option<String> = row.get(4)?;
    let created_at_str: String = row.get(5)?;

    let created_at = NaiveDateTime::parse_from_str(&created_at_str, "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|_| Utc::now().naive_utc());

    Ok(User {
        id,
        username,
        email,
        user_type: UserType::parse(&user_type_str),
        phone,
        created_at,
    })
}

// ── Listings ──

const LISTING_COLS: &str =
    "id, title, description, location, city, district, price, rooms, property_type, is_active, \
     owner_id, created_at, updated_at";

pub fn insert_listing(conn: &Connection, listing: &Listing) -> anyhow::Result<()> {
    let created_at = listing.created_at.format("%Y-%m-%d %H:%M:%S").to_string();
    let updated_at = listing.updated_at.format("%Y-%m-%d %H:%M:%S").to_string();

    conn.execute(
        "INSERT INTO listings (id, title, description, location, city, district, price, rooms, \
         property_type, is_active, owner_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            listing.id,
            listing.title,
            listing.description,
            listing.location,
            listing.city,
            listing.district,
            listing.price,
            listing.rooms,
            listing.property_type.as_str(),
            listing.is_active as i32,
            listing.owner_id,
            created_at,
            updated_at,
        ],
    )?;
    Ok(())
}

pub fn get_listing(conn: &Connection, id: &str) -> anyhow::Result<Option<Listing>> {
    let result = conn.query_row(
        &format!("SELECT {LISTING_COLS} FROM listings WHERE id = ?1"),
        params![id],
        |row| Ok(parse_listing_row(row)),
    );

    match result {
        Ok(listing) => Ok(Some(listing?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub struct ListingWithOwner {
    pub listing: Listing,
    pub owner_username: String,
}

pub fn get_listing_with_owner(
    conn: &Connection,
    id: &str,
) -> anyhow::Result<Option<ListingWithOwner>> {
    let result = conn.query_row(
        "SELECT l.id, l.title, l.description, l.location, l.city, l.district, l.price, l.rooms, \
         l.property_type, l.is_active, l.owner_id, l.created_at, l.updated_at, u.username
         FROM listings l JOIN users u ON l.owner_id = u.id WHERE l.id = ?1",
        params![id],
        |row| Ok(parse_listing_with_owner_row(row)),
    );

    match result {
        Ok(listing) => Ok(Some(listing?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_listing(conn: &Connection, listing: &Listing) -> anyhow::Result<bool> {
    let updated_at = listing.updated_at.format("%Y-%m-%d %H:%M:%S").to_string();

    let count = conn.execute(
        "UPDATE listings SET title = ?1, description = ?2, location = ?3, city = ?4, \
         district = ?5, price = ?6, rooms = ?7, property_type = ?8, is_active = ?9, \
         updated_at = ?10 WHERE id = ?11",
        params![
            listing.title,
            listing.description,
            listing.location,
            listing.city,
            listing.district,
            listing.price,
            listing.rooms,
            listing.property_type.as_str(),
            listing.is_active as i32,
            updated_at,
            listing.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn set_listing_active(conn: &Connection, id: &str, active: bool) -> anyhow::Result<bool> {
    let now = Utc::now()
        .naive_utc()
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();
    let count = conn.execute(
        "UPDATE listings SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
        params![active as i32, now, id],
    )?;
    Ok(count > 0)
}

pub fn delete_listing(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM listings WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub struct ListingFilters {
    pub city: Option<String>,
    pub district: Option<String>,
    pub property_type: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_rooms: Option<i64>,
    pub max_rooms: Option<i64>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
    pub owner_id: Option<String>,
    pub only_active: bool,
    pub ordering: Option<String>,
    pub limit: i64,
}

impl Default for ListingFilters {
    fn default() -> Self {
        Self {
            city: None,
            district: None,
            property_type: None,
            min_price: None,
            max_price: None,
            min_rooms: None,
            max_rooms: None,
            is_active: None,
            search: None,
            owner_id: None,
            only_active: false,
            ordering: None,
            limit: 50,
        }
    }
}

pub fn list_listings(
    conn: &Connection,
    filters: &ListingFilters,
) -> anyhow::Result<Vec<ListingWithOwner>> {
    let mut sql = String::from(
        "SELECT l.id, l.title, l.description, l.location, l.city, l.district, l.price, l.rooms, \
         l.property_type, l.is_active, l.owner_id, l.created_at, l.updated_at, u.username
         FROM listings l JOIN users u ON l.owner_id = u.id WHERE 1=1",
    );
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = vec![];

    if let Some(owner_id) = &filters.owner_id {
        sql.push_str(" AND l.owner_id = ?");
        params_vec.push(Box::new(owner_id.clone()));
    }
    if filters.only_active {
        sql.push_str(" AND l.is_active = 1");
    }
    if let Some(is_active) = filters.is_active {
        sql.push_str(" AND l.is_active = ?");
        params_vec.push(Box::new(is_active as i32));
    }
    if let Some(city) = &filters.city {
        sql.push_str(" AND l.city LIKE ?");
        params_vec.push(Box::new(format!("%{city}%")));
    }
    if let Some(district) = &filters.district {
        sql.push_str(" AND l.district LIKE ?");
        params_vec.push(Box::new(format!("%{district}%")));
    }
    if let Some(property_type) = &filters.property_type {
        sql.push_str(" AND l.property_type = ?");
        params_vec.push(Box::new(property_type.clone()));
    }
    if let Some(min_price) = filters.min_price {
        sql.push_str(" AND l.price >= ?");
        params_vec.push(Box::new(min_price));
    }
    if let Some(max_price) = filters.max_price {
        sql.push_str(" AND l.price <= ?");
        params_vec.push(Box::new(max_price));
    }
    if let Some(min_rooms) = filters.min_rooms {
        sql.push_str(" AND l.rooms >= ?");
        params_vec.push(Box::new(min_rooms));
    }
    if let Some(max_rooms) = filters.max_rooms {
        sql.push_str(" AND l.rooms <= ?");
        params_vec.push(Box::new(max_rooms));
    }
    if let Some(search) = &filters.search {
        sql.push_str(
            " AND (l.title LIKE ? OR l.description LIKE ? OR l.location LIKE ? \
             OR l.city LIKE ? OR l.district LIKE ?)",
        );
        let pattern = format!("%{search}%");
        for _ in 0..5 {
            params_vec.push(Box::new(pattern.clone()));
        }
    }

    // Ordering is whitelisted; anything unrecognized falls back to newest-first.
    let order_clause = match filters.ordering.as_deref() {
        Some("price") => "l.price ASC",
        Some("-price") => "l.price DESC",
        Some("rooms") => "l.rooms ASC",
        Some("-rooms") => "l.rooms DESC",
        Some("created_at") => "l.created_at ASC",
        Some("updated_at") => "l.updated_at ASC",
        Some("-updated_at") => "l.updated_at DESC",
        _ => "l.created_at DESC",
    };
    sql.push_str(&format!(" ORDER BY {order_clause} LIMIT ?"));
    params_vec.push(Box::new(filters.limit));

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| {
        Ok(parse_listing_with_owner_row(row))
    })?;

    let mut listings = vec![];
    for row in rows {
        listings.push(row??);
    }
    Ok(listings)
}

fn parse_listing_row(row: &rusqlite::Row) -> anyhow::Result<Listing> {
    let id: String = row.get(0)?;
    let title: String = row.get(1)?;
    let description: String = row.get(2)?;
    let location: String = row.get(3)?;
    let city: String = row.get(4)?;
    let district: Option<String> = row.get(5)?;
    let price: f64 = row.get(6)?;
    let rooms: i64 = row.get(7)?;
    let property_type_str: String = row.get(8)?;
    let is_active: bool = row.get::<_, i32>(9)? != 0;
    let owner_id: String = row.get(10)?;
    let created_at_str: String = row.get(11)?;
    let updated_at_str: String = row.get(12)?;

    let created_at = NaiveDateTime::parse_from_str(&created_at_str, "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    let updated_at = NaiveDateTime::parse_from_str(&updated_at_str, "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|_| Utc::now().naive_utc());

    Ok(Listing {
        id,
        title,
        description,
        location,
        city,
        district,
        price,
        rooms,
        property_type: PropertyType::parse(&property_type_str),
        is_active,
        owner_id,
        created_at,
        updated_at,
    })
}

fn parse_listing_with_owner_row(row: &rusqlite::Row) -> anyhow::Result<ListingWithOwner> {
    let listing = parse_listing_row(row)?;
    let owner_username: String = row.get(13)?;
    Ok(ListingWithOwner {
        listing,
        owner_username,
    })
}

// ── Bookings ──

pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    let start_date = booking.start_date.format("%Y-%m-%d").to_string();
    let end_date = booking.end_date.format("%Y-%m-%d").to_string();
    let created_at = booking.created_at.format("%Y-%m-%d %H:%M:%S").to_string();

    conn.execute(
        "INSERT INTO bookings (id, listing_id, tenant_id, start_date, end_date, status, \
         total_price, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            booking.id,
            booking.listing_id,
            booking.tenant_id,
            start_date,
            end_date,
            booking.status.as_str(),
            booking.total_price,
            created_at,
        ],
    )?;
    Ok(())
}

pub fn get_booking(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        "SELECT id, listing_id, tenant_id, start_date, end_date, status, total_price, created_at
         FROM bookings WHERE id = ?1",
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Conditional status write: applies only if the row still holds `expected`.
/// The row count is the success signal, which is what makes transitions safe
/// to race: the loser of two concurrent transitions sees `false`, not a
/// half-applied update.
pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    expected: BookingStatus,
    new: BookingStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1 WHERE id = ?2 AND status = ?3",
        params![new.as_str(), id, expected.as_str()],
    )?;
    Ok(count > 0)
}

/// Bookings on one listing whose status is in `statuses`, the candidate set
/// for conflict checks.
pub fn get_listing_bookings_by_status(
    conn: &Connection,
    listing_id: &str,
    statuses: &[BookingStatus],
) -> anyhow::Result<Vec<Booking>> {
    if statuses.is_empty() {
        return Ok(vec![]);
    }

    let status_list = statuses
        .iter()
        .map(|s| format!("'{}'", s.as_str()))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT id, listing_id, tenant_id, start_date, end_date, status, total_price, created_at
         FROM bookings WHERE listing_id = ?1 AND status IN ({status_list}) ORDER BY start_date ASC"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![listing_id], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub struct BookingSummary {
    pub booking: Booking,
    pub listing_title: String,
    pub listing_owner_id: String,
    pub tenant_email: String,
}

const BOOKING_SUMMARY_SELECT: &str =
    "SELECT b.id, b.listing_id, b.tenant_id, b.start_date, b.end_date, b.status, b.total_price, \
     b.created_at, l.title, l.owner_id, u.email
     FROM bookings b
     JOIN listings l ON b.listing_id = l.id
     JOIN users u ON b.tenant_id = u.id";

pub fn get_booking_summary(conn: &Connection, id: &str) -> anyhow::Result<Option<BookingSummary>> {
    let result = conn.query_row(
        &format!("{BOOKING_SUMMARY_SELECT} WHERE b.id = ?1"),
        params![id],
        |row| Ok(parse_booking_summary_row(row)),
    );

    match result {
        Ok(summary) => Ok(Some(summary?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_bookings_for_tenant(
    conn: &Connection,
    tenant_id: &str,
) -> anyhow::Result<Vec<BookingSummary>> {
    let sql = format!("{BOOKING_SUMMARY_SELECT} WHERE b.tenant_id = ?1 ORDER BY b.created_at DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![tenant_id], |row| Ok(parse_booking_summary_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn list_bookings_for_owner(
    conn: &Connection,
    owner_id: &str,
) -> anyhow::Result<Vec<BookingSummary>> {
    let sql = format!("{BOOKING_SUMMARY_SELECT} WHERE l.owner_id = ?1 ORDER BY b.created_at DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![owner_id], |row| Ok(parse_booking_summary_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let id: String = row.get(0)?;
    let listing_id: String = row.get(1)?;
    let tenant_id: String = row.get(2)?;
    let start_date_str: String = row.get(3)?;
    let end_date_str: String = row.get(4)?;
    let status_str: String = row.get(5)?;
    let total_price: f64 = row.get(6)?;
    let created_at_str: String = row.get(7)?;

    let start_date = NaiveDate::parse_from_str(&start_date_str, "%Y-%m-%d")
        .unwrap_or_else(|_| Utc::now().date_naive());
    let end_date = NaiveDate::parse_from_str(&end_date_str, "%Y-%m-%d")
        .unwrap_or_else(|_| Utc::now().date_naive());
    let created_at = NaiveDateTime::parse_from_str(&created_at_str, "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|_| Utc::now().naive_utc());

    Ok(Booking {
        id,
        listing_id,
        tenant_id,
        start_date,
        end_date,
        status: BookingStatus::parse(&status_str),
        total_price,
        created_at,
    })
}

fn parse_booking_summary_row(row: &rusqlite::Row) -> anyhow::Result<BookingSummary> {
    let booking = parse_booking_row(row)?;
    let listing_title: String = row.get(8)?;
    let listing_owner_id: String = row.get(9)?;
    let tenant_email: String = row.get(10)?;

    Ok(BookingSummary {
        booking,
        listing_title,
        listing_owner_id,
        tenant_email,
    })
}

// ── Reviews ──

pub fn insert_review(conn: &Connection, review: &Review) -> anyhow::Result<()> {
    let created_at = review.created_at.format("%Y-%m-%d %H:%M:%S").to_string();
    let updated_at = review.updated_at.format("%Y-%m-%d %H:%M:%S").to_string();

    conn.execute(
        "INSERT INTO reviews (id, booking_id, listing_id, author_id, rating, comment, \
         created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            review.id,
            review.booking_id,
            review.listing_id,
            review.author_id,
            review.rating,
            review.comment,
            created_at,
            updated_at,
        ],
    )?;
    Ok(())
}

pub fn get_review(conn: &Connection, id: &str) -> anyhow::Result<Option<Review>> {
    let result = conn.query_row(
        "SELECT id, booking_id, listing_id, author_id, rating, comment, created_at, updated_at
         FROM reviews WHERE id = ?1",
        params![id],
        |row| Ok(parse_review_row(row)),
    );

    match result {
        Ok(review) => Ok(Some(review?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn review_exists_for_booking(conn: &Connection, booking_id: &str) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM reviews WHERE booking_id = ?1",
        params![booking_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn update_review(conn: &Connection, review: &Review) -> anyhow::Result<bool> {
    let updated_at = review.updated_at.format("%Y-%m-%d %H:%M:%S").to_string();

    let count = conn.execute(
        "UPDATE reviews SET rating = ?1, comment = ?2, updated_at = ?3 WHERE id = ?4",
        params![review.rating, review.comment, updated_at, review.id],
    )?;
    Ok(count > 0)
}

pub fn delete_review(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM reviews WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub struct ReviewSummary {
    pub review: Review,
    pub listing_title: String,
    pub listing_owner_id: String,
    pub author_username: String,
}

const REVIEW_SUMMARY_SELECT: &str =
    "SELECT r.id, r.booking_id, r.listing_id, r.author_id, r.rating, r.comment, r.created_at, \
     r.updated_at, l.title, l.owner_id, u.username
     FROM reviews r
     JOIN listings l ON r.listing_id = l.id
     JOIN users u ON r.author_id = u.id";

pub fn get_review_summary(conn: &Connection, id: &str) -> anyhow::Result<Option<ReviewSummary>> {
    let result = conn.query_row(
        &format!("{REVIEW_SUMMARY_SELECT} WHERE r.id = ?1"),
        params![id],
        |row| Ok(parse_review_summary_row(row)),
    );

    match result {
        Ok(summary) => Ok(Some(summary?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_reviews_for_author(
    conn: &Connection,
    author_id: &str,
) -> anyhow::Result<Vec<ReviewSummary>> {
    let sql = format!("{REVIEW_SUMMARY_SELECT} WHERE r.author_id = ?1 ORDER BY r.created_at DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![author_id], |row| Ok(parse_review_summary_row(row)))?;

    let mut reviews = vec![];
    for row in rows {
        reviews.push(row??);
    }
    Ok(reviews)
}

pub fn list_reviews_for_owner(
    conn: &Connection,
    owner_id: &str,
) -> anyhow::Result<Vec<ReviewSummary>> {
    let sql = format!("{REVIEW_SUMMARY_SELECT} WHERE l.owner_id = ?1 ORDER BY r.created_at DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![owner_id], |row| Ok(parse_review_summary_row(row)))?;

    let mut reviews = vec![];
    for row in rows {
        reviews.push(row??);
    }
    Ok(reviews)
}

fn parse_review_row(row: &rusqlite::Row) -> anyhow::Result<Review> {
    let id: String = row.get(0)?;
    let booking_id: String = row.get(1)?;
    let listing_id: String = row.get(2)?;
    let author_id: String = row.get(3)?;
    let rating: i64 = row.get(4)?;
    let comment: String = row.get(5)?;
    let created_at_str: String = row.get(6)?;
    let updated_at_str: String = row.get(7)?;

    let created_at = NaiveDateTime::parse_from_str(&created_at_str, "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    let updated_at = NaiveDateTime::parse_from_str(&updated_at_str, "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|_| Utc::now().naive_utc());

    Ok(Review {
        id,
        booking_id,
        listing_id,
        author_id,
        rating,
        comment,
        created_at,
        updated_at,
    })
}

fn parse_review_summary_row(row: &rusqlite::Row) -> anyhow::Result<ReviewSummary> {
    let review = parse_review_row(row)?;
    let listing_title: String = row.get(8)?;
    let listing_owner_id: String = row.get(9)?;
    let author_username: String = row.get(10)?;

    Ok(ReviewSummary {
        review,
        listing_title,
        listing_owner_id,
        author_username,
    })
}
