use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A conversation thread as returned by the remote service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    /// Unix seconds, as reported by the service.
    #[serde(default)]
    pub created_at: i64,
}

/// A registry entry for a remote thread this process has handed out.
///
/// The registry keeps no transcript; the remote service owns the message
/// history and this record only proves the id came from us.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

impl ThreadRecord {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
        }
    }
}
