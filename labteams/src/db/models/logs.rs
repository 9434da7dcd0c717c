//! Database models for audit log rows.

use crate::types::UserId;
use chrono::{DateTime, Utc};

/// Database request for appending an audit log row
#[derive(Debug, Clone)]
pub struct LogCreateDBRequest {
    /// Severity label, e.g. "Error"
    pub log_type: String,
    pub user_id: Option<UserId>,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Database response for an audit log row
#[derive(Debug, Clone)]
pub struct LogDBResponse {
    pub id: i64,
    pub log_type: String,
    pub user_id: Option<UserId>,
    pub body: String,
    pub created_at: DateTime<Utc>,
}
