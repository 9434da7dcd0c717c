//! Audit log for failures swallowed at the form controller.
//!
//! The controller never reports errors to the browser. Instead each failure becomes an
//! [`AuditEntry`] carrying the acting user and the error message, recorded through an
//! [`AuditLog`] implementation. [`DbAuditLog`] appends to the `logs` table.

use std::fmt;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::db::{
    errors::DbError,
    handlers::Logs,
    models::logs::{LogCreateDBRequest, LogDBResponse},
};
use crate::types::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "Error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub severity: Severity,
    pub user_id: Option<UserId>,
    pub message: String,
}

impl AuditEntry {
    pub fn error(user_id: Option<UserId>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            user_id,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuditLogError {
    #[error("Failed to persist audit entry: {0}")]
    Storage(#[from] DbError),
}

/// Sink for audit entries.
///
/// Callers treat a failed `record` as non-fatal: it is traced and the request carries on.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(&self, entry: AuditEntry) -> Result<(), AuditLogError>;

    /// Most recent entries first.
    async fn recent(&self, limit: i64) -> Result<Vec<LogDBResponse>, AuditLogError>;
}

/// Audit log backed by the `logs` table.
#[derive(Debug, Clone)]
pub struct DbAuditLog {
    pool: SqlitePool,
}

impl DbAuditLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLog for DbAuditLog {
    async fn record(&self, entry: AuditEntry) -> Result<(), AuditLogError> {
        tracing::warn!(
            severity = %entry.severity,
            user_id = entry.user_id,
            "Audit: {}",
            entry.message
        );

        let mut conn = self.pool.acquire().await.map_err(DbError::from)?;
        Logs::new(&mut conn)
            .create(&LogCreateDBRequest {
                log_type: entry.severity.to_string(),
                user_id: entry.user_id,
                body: entry.message,
                created_at: Utc::now(),
            })
            .await?;

        Ok(())
    }

    async fn recent(&self, limit: i64) -> Result<Vec<LogDBResponse>, AuditLogError> {
        let mut conn = self.pool.acquire().await.map_err(DbError::from)?;
        Ok(Logs::new(&mut conn).list_recent(limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_labels() {
        assert_eq!(Severity::Error.to_string(), "Error");
        assert_eq!(AuditEntry::error(Some(3), "boom").severity, Severity::Error);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_db_audit_log_records_entries(pool: SqlitePool) {
        let audit = DbAuditLog::new(pool);

        audit
            .record(AuditEntry::error(Some(12), "Insufficient permissions to Create team groups"))
            .await
            .unwrap();
        audit.record(AuditEntry::error(None, "Bad action keyword")).await.unwrap();

        let entries = audit.recent(10).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].body, "Bad action keyword");
        assert_eq!(entries[0].user_id, None);
        assert_eq!(entries[1].log_type, "Error");
        assert_eq!(entries[1].user_id, Some(12));
    }
}
