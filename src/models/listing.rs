use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
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
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Apartment,
    House,
    Studio,
    Room,
    Villa,
    Cottage,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Apartment => "apartment",
            PropertyType::House => "house",
            PropertyType::Studio => "studio",
            PropertyType::Room => "room",
            PropertyType::Villa => "villa",
            PropertyType::Cottage => "cottage",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "house" => PropertyType::House,
            "studio" => PropertyType::Studio,
            "room" => PropertyType::Room,
            "villa" => PropertyType::Villa,
            "cottage" => PropertyType::Cottage,
            _ => PropertyType::Apartment,
        }
    }
}
