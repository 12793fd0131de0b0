use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub user_type: UserType,
    pub phone: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Tenant,
    Landlord,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Tenant => "tenant",
            UserType::Landlord => "landlord",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "landlord" => UserType::Landlord,
            _ => UserType::Tenant,
        }
    }
}

/// Resolved caller identity. Authentication happens upstream; every operation
/// receives this pair and never probes for a user type itself.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub user_type: UserType,
}

impl Identity {
    pub fn is_tenant(&self) -> bool {
        self.user_type == UserType::Tenant
    }

    pub fn is_landlord(&self) -> bool {
        self.user_type == UserType::Landlord
    }
}
