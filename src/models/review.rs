use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One review per booking; `listing_id` is denormalized from the booking at
/// creation so listing reviews can be listed without a join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub booking_id: String,
    pub listing_id: String,
    pub author_id: String,
    pub rating: i64,
    pub comment: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
