use axum::http::HeaderMap;
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Identity, User};

/// Caller identity arrives as a user id header, resolved against the users
/// table. Upstream is expected to have authenticated the request already.
pub const USER_ID_HEADER: &str = "x-user-id";

pub fn resolve_user(conn: &Connection, headers: &HeaderMap) -> Result<User, AppError> {
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if user_id.is_empty() {
        return Err(AppError::Unauthorized);
    }

    queries::get_user(conn, user_id)?.ok_or(AppError::Unauthorized)
}

pub fn require_identity(conn: &Connection, headers: &HeaderMap) -> Result<Identity, AppError> {
    let user = resolve_user(conn, headers)?;
    Ok(Identity {
        user_id: user.id,
        user_type: user.user_type,
    })
}

/// Identity for endpoints that are public but behave differently for a known
/// caller. An absent header is anonymous; a header naming an unknown user is
/// still rejected.
pub fn optional_identity(
    conn: &Connection,
    headers: &HeaderMap,
) -> Result<Option<Identity>, AppError> {
    if headers.get(USER_ID_HEADER).is_none() {
        return Ok(None);
    }
    require_identity(conn, headers).map(Some)
}
