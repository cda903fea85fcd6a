//! Client-side cache of the logged-in user's profile.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::claims::UserId;

/// Avatar shown until the backend supplies one
pub const DEFAULT_AVATAR: &str = "https://randomuser.me/api/portraits/men/1.jpg";

/// Role label the backend assigns to ordinary members
pub const DEFAULT_ROLE: &str = "普通用户";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Principal {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub avatar: String,
    pub bio: String,
    pub role: String,
    pub borrowed_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Default for Principal {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            email: String::new(),
            phone: String::new(),
            avatar: DEFAULT_AVATAR.to_string(),
            bio: String::new(),
            role: DEFAULT_ROLE.to_string(),
            borrowed_count: 0,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }
}

impl Principal {
    pub fn is_anonymous(&self) -> bool {
        self.id.is_empty()
    }

    pub fn user_id(&self) -> UserId {
        UserId::from_raw(&self.id)
    }

    /// Name for display, falling back to the email address
    pub fn display_name(&self) -> &str {
        if !self.name.is_empty() {
            &self.name
        } else if !self.email.is_empty() {
            &self.email
        } else {
            "Guest"
        }
    }
}

/// Profile fields returned by the server. Absent fields leave the cached
/// value alone; unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PrincipalPatch {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, alias = "phoneNumber", deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub avatar: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub bio: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub role: Option<String>,
    #[serde(default, alias = "borrowedCount")]
    pub borrowed_count: Option<i64>,
    #[serde(default, alias = "createdAt", alias = "createTime", deserialize_with = "lenient_string")]
    pub created_at: Option<String>,
    #[serde(default, alias = "updatedAt", alias = "updateTime", deserialize_with = "lenient_string")]
    pub updated_at: Option<String>,
}

/// Accept strings and numbers; null reads as absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

impl PrincipalPatch {
    /// Parse a server payload. Non-object payloads produce an empty patch.
    pub fn from_value(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    fn apply(self, base: &Principal) -> Principal {
        Principal {
            id: self.id.unwrap_or_else(|| base.id.clone()),
            name: self.name.unwrap_or_else(|| base.name.clone()),
            email: self.email.unwrap_or_else(|| base.email.clone()),
            phone: self.phone.unwrap_or_else(|| base.phone.clone()),
            avatar: self.avatar.unwrap_or_else(|| base.avatar.clone()),
            bio: self.bio.unwrap_or_else(|| base.bio.clone()),
            role: self.role.unwrap_or_else(|| base.role.clone()),
            borrowed_count: self.borrowed_count.unwrap_or(base.borrowed_count),
            created_at: self.created_at.unwrap_or_else(|| base.created_at.clone()),
            updated_at: self.updated_at.unwrap_or_else(|| base.updated_at.clone()),
        }
    }
}

/// Shared, atomically replaced profile record.
#[derive(Clone, Default)]
pub struct PrincipalStore {
    info: Arc<RwLock<Principal>>,
}

impl PrincipalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Principal {
        self.info.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Overlay server fields onto the cached record and return the result.
    pub fn merge(&self, patch: PrincipalPatch) -> Principal {
        let mut info = self.info.write().unwrap_or_else(|e| e.into_inner());
        let merged = patch.apply(&info);
        *info = merged.clone();
        merged
    }

    pub fn reset(&self) {
        *self.info.write().unwrap_or_else(|e| e.into_inner()) = Principal::default();
    }
}
