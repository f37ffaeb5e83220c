use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Page size used when the caller does not pick one.
pub const DEFAULT_PAGE_SIZE: usize = 20;

// ========== USER ==========

/// One user account document. Field names follow the upstream documents
/// (camelCase); attributes this core does not model round-trip through
/// `extra` unmodified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fullname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default)]
    pub balance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_suspended: bool,
    /// Set at account creation upstream; never written here.
    pub registration_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_true() -> bool {
    true
}

// ========== ROLE ==========

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }

    /// Stored role strings outside the known set fall back to the default.
    pub fn parse(value: &str) -> Role {
        match value {
            "moderator" => Role::Moderator,
            "admin" => Role::Admin,
            "super_admin" => Role::SuperAdmin,
            _ => Role::User,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Role::parse(&value))
    }
}

// ========== PARTIAL UPDATE ==========

/// Partial-merge payload for [`crate::store::UserStore::update_user`]. `None`
/// leaves a field untouched upstream. For fields the operator can blank out,
/// the outer `Option` selects the field and the inner one distinguishes a
/// written value from an explicit clear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub fullname: Option<String>,
    pub username: Option<Option<String>>,
    pub balance: Option<f64>,
    pub country: Option<Option<String>>,
    pub currency: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub is_suspended: Option<bool>,
    pub suspended_at: Option<Option<DateTime<Utc>>>,
    /// Open-extension attributes written through as-is.
    pub extra: Map<String, Value>,
}

impl UserUpdate {
    /// Keep the suspension timestamp in step with the flag: a write that sets
    /// `is_suspended` without an explicit timestamp gets one stamped (set on
    /// suspend, cleared on unsuspend). Store implementations apply this before
    /// merging.
    pub fn sync_suspension(mut self, now: DateTime<Utc>) -> Self {
        if self.suspended_at.is_none() {
            if let Some(suspended) = self.is_suspended {
                self.suspended_at = Some(if suspended { Some(now) } else { None });
            }
        }
        self
    }
}

// ========== PAGINATION ==========

/// Opaque continuation token bound to the last record of a fetched page.
/// Minted and consumed by store implementations; callers only hand it back
/// to "fetch next page".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    sort_key: String,
    id: String,
}

impl PageCursor {
    pub fn new(sort_key: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            sort_key: sort_key.into(),
            id: id.into(),
        }
    }

    /// Raw registration-date sort key exactly as stored.
    pub fn sort_key(&self) -> &str {
        &self.sort_key
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// One fetched page, registration-date descending.
#[derive(Debug, Clone, Default)]
pub struct UserPage {
    pub users: Vec<User>,
    pub next_cursor: Option<PageCursor>,
    /// A full page was returned, so another fetch may yield more.
    pub has_more: bool,
}
