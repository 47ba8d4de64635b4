use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of roles an account can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
    Healer,
    Vendor,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Customer, Role::Admin, Role::Healer, Role::Vendor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Admin => "admin",
            Role::Healer => "healer",
            Role::Vendor => "vendor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no known role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    // exact match only; "Admin" is not a role
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Registered identity.
///
/// `password_digest` and `mfa_secret` never leave the process: both are
/// skipped during serialization so an `Account` can be written straight
/// into a response body.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Account {
    /// `<role>_<uuid>`, assigned at creation and never changed
    pub id: String,
    /// lowercase, unique across every role
    pub email: String,
    #[serde(skip_serializing)]
    pub password_digest: String,
    pub name: String,
    pub phone_number: String,
    pub role: Role,
    /// reserved for a second factor; no flow reads it yet
    #[serde(skip_serializing)]
    pub mfa_secret: Option<String>,
    pub email_verified: bool,
    pub phone_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Build a fresh, unverified account with a newly generated id
    pub fn new(
        email: String,
        password_digest: String,
        name: String,
        phone_number: String,
        role: Role,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Self::generate_id(role),
            email,
            password_digest,
            name,
            phone_number,
            role,
            mfa_secret: None,
            email_verified: false,
            phone_verified: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn generate_id(role: Role) -> String {
        format!("{}_{}", role.as_str(), uuid::Uuid::new_v4().simple())
    }
}
