use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Identity, Listing, PropertyType};
use crate::state::AppState;

#[derive(Serialize)]
pub struct ListingResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub city: String,
    pub district: Option<String>,
    pub price: f64,
    pub rooms: i64,
    pub property_type: PropertyType,
    pub is_active: bool,
    pub owner_id: String,
    pub owner_username: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<queries::ListingWithOwner> for ListingResponse {
    fn from(row: queries::ListingWithOwner) -> Self {
        let listing = row.listing;
        Self {
            id: listing.id,
            title: listing.title,
            description: listing.description,
            location: listing.location,
            city: listing.city,
            district: listing.district,
            price: listing.price,
            rooms: listing.rooms,
            property_type: listing.property_type,
            is_active: listing.is_active,
            owner_id: listing.owner_id,
            owner_username: row.owner_username,
            created_at: listing.created_at,
            updated_at: listing.updated_at,
        }
    }
}

fn parse_property_type(s: &str) -> Result<PropertyType, AppError> {
    match s {
        "apartment" => Ok(PropertyType::Apartment),
        "house" => Ok(PropertyType::House),
        "studio" => Ok(PropertyType::Studio),
        "room" => Ok(PropertyType::Room),
        "villa" => Ok(PropertyType::Villa),
        "cottage" => Ok(PropertyType::Cottage),
        _ => Err(AppError::Validation("invalid property type".to_string())),
    }
}

fn validate_pricing(price: f64, rooms: i64) -> Result<(), AppError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(AppError::Validation("price must be positive".to_string()));
    }
    if rooms < 1 {
        return Err(AppError::Validation("rooms must be at least 1".to_string()));
    }
    Ok(())
}

// POST /api/listings
#[derive(Deserialize)]
pub struct CreateListingRequest {
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub city: String,
    pub district: Option<String>,
    pub price: f64,
    pub rooms: i64,
    pub property_type: String,
}

pub async fn create_listing(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateListingRequest>,
) -> Result<(StatusCode, Json<Listing>), AppError> {
    let db = state.db.lock().unwrap();
    let identity = auth::require_identity(&db, &headers)?;
    if !identity.is_landlord() {
        return Err(AppError::Forbidden(
            "only landlords can create listings".to_string(),
        ));
    }

    let title = req.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("title must not be empty".to_string()));
    }
    validate_pricing(req.price, req.rooms)?;
    let property_type = parse_property_type(&req.property_type)?;

    let now = Utc::now().naive_utc();
    let listing = Listing {
        id: Uuid::new_v4().to_string(),
        title: title.to_string(),
        description: req.description.unwrap_or_default(),
        location: req.location,
        city: req.city,
        district: req.district,
        price: req.price,
        rooms: req.rooms,
        property_type,
        is_active: true,
        owner_id: identity.user_id,
        created_at: now,
        updated_at: now,
    };
    queries::insert_listing(&db, &listing)?;
    tracing::info!(listing_id = %listing.id, "listing created");

    Ok((StatusCode::CREATED, Json(listing)))
}

// GET /api/listings
#[derive(Deserialize)]
pub struct ListingsQuery {
    pub city: Option<String>,
    pub district: Option<String>,
    pub property_type: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_rooms: Option<i64>,
    pub max_rooms: Option<i64>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_listings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListingsQuery>,
) -> Result<Json<Vec<ListingResponse>>, AppError> {
    let db = state.db.lock().unwrap();
    let identity = auth::optional_identity(&db, &headers)?;

    let property_type = match &query.property_type {
        Some(raw) => Some(parse_property_type(raw)?.as_str().to_string()),
        None => None,
    };

    let mut filters = queries::ListingFilters {
        city: query.city,
        district: query.district,
        property_type,
        min_price: query.min_price,
        max_price: query.max_price,
        min_rooms: query.min_rooms,
        max_rooms: query.max_rooms,
        search: query.search,
        ordering: query.ordering,
        limit: query.limit.unwrap_or(50).clamp(1, 200),
        ..Default::default()
    };

    match &identity {
        // Landlords manage their own inventory and see nothing else
        Some(ident) if ident.is_landlord() => {
            filters.owner_id = Some(ident.user_id.clone());
            filters.is_active = query.is_active;
        }
        // Tenants and anonymous callers browse active listings only
        _ => {
            filters.only_active = true;
        }
    }

    let rows = queries::list_listings(&db, &filters)?;
    Ok(Json(rows.into_iter().map(ListingResponse::from).collect()))
}

// GET /api/listings/:id
pub async fn get_listing(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ListingResponse>, AppError> {
    let db = state.db.lock().unwrap();
    let identity = auth::optional_identity(&db, &headers)?;

    let row = queries::get_listing_with_owner(&db, &id)?
        .ok_or_else(|| AppError::NotFound(format!("listing {id}")))?;

    let visible = match &identity {
        Some(ident) if ident.is_landlord() => row.listing.owner_id == ident.user_id,
        _ => row.listing.is_active,
    };
    if !visible {
        return Err(AppError::NotFound(format!("listing {id}")));
    }

    Ok(Json(ListingResponse::from(row)))
}

// PUT /api/listings/:id
#[derive(Deserialize)]
pub struct UpdateListingRequest {
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub city: String,
    pub district: Option<String>,
    pub price: f64,
    pub rooms: i64,
    pub property_type: String,
}

pub async fn update_listing(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdateListingRequest>,
) -> Result<Json<Listing>, AppError> {
    let db = state.db.lock().unwrap();
    let identity = auth::require_identity(&db, &headers)?;

    let mut listing = load_owned_listing(&db, &identity, &id, "update")?;

    let title = req.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("title must not be empty".to_string()));
    }
    validate_pricing(req.price, req.rooms)?;

    listing.title = title.to_string();
    listing.description = req.description.unwrap_or_default();
    listing.location = req.location;
    listing.city = req.city;
    listing.district = req.district;
    listing.price = req.price;
    listing.rooms = req.rooms;
    listing.property_type = parse_property_type(&req.property_type)?;
    listing.updated_at = Utc::now().naive_utc();

    queries::update_listing(&db, &listing)?;
    Ok(Json(listing))
}

// DELETE /api/listings/:id
pub async fn delete_listing(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = state.db.lock().unwrap();
    let identity = auth::require_identity(&db, &headers)?;

    load_owned_listing(&db, &identity, &id, "delete")?;
    queries::delete_listing(&db, &id)?;
    tracing::info!(listing_id = %id, "listing deleted");

    Ok(Json(serde_json::json!({ "ok": true })))
}

// POST /api/listings/:id/toggle_active
pub async fn toggle_active(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = state.db.lock().unwrap();
    let identity = auth::require_identity(&db, &headers)?;

    let listing = load_owned_listing(&db, &identity, &id, "toggle")?;
    let now_active = !listing.is_active;
    queries::set_listing_active(&db, &id, now_active)?;

    let message = if now_active {
        "listing activated"
    } else {
        "listing deactivated"
    };
    Ok(Json(serde_json::json!({
        "id": id,
        "is_active": now_active,
        "message": message,
    })))
}

fn load_owned_listing(
    db: &rusqlite::Connection,
    identity: &Identity,
    id: &str,
    verb: &str,
) -> Result<Listing, AppError> {
    let listing = queries::get_listing(db, id)?
        .ok_or_else(|| AppError::NotFound(format!("listing {id}")))?;
    if listing.owner_id != identity.user_id {
        return Err(AppError::Forbidden(format!(
            "only the listing owner can {verb} it"
        )));
    }
    Ok(listing)
}
