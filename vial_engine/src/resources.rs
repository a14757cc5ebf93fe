//! Id and clock sources.

use chrono::{DateTime, Utc};

/// Fresh unique id.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current UTC time.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}
