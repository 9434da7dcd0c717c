//! Database repository for the audit log table.

use crate::db::{
    errors::Result,
    models::logs::{LogCreateDBRequest, LogDBResponse},
};
use crate::types::UserId;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};
use tracing::instrument;

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct Log {
    pub id: i64,
    #[sqlx(rename = "type")]
    pub log_type: String,
    pub user_id: Option<UserId>,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl From<Log> for LogDBResponse {
    fn from(log: Log) -> Self {
        Self {
            id: log.id,
            log_type: log.log_type,
            user_id: log.user_id,
            body: log.body,
            created_at: log.created_at,
        }
    }
}

pub struct Logs<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Logs<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(log_type = %request.log_type), err)]
    pub async fn create(&mut self, request: &LogCreateDBRequest) -> Result<LogDBResponse> {
        let log = sqlx::query_as::<_, Log>(
            "INSERT INTO logs (type, user_id, body, created_at) VALUES (?, ?, ?, ?) RETURNING id, type, user_id, body, created_at",
        )
        .bind(&request.log_type)
        .bind(request.user_id)
        .bind(&request.body)
        .bind(request.created_at)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(LogDBResponse::from(log))
    }

    /// Most recent entries first.
    #[instrument(skip(self), err)]
    pub async fn list_recent(&mut self, limit: i64) -> Result<Vec<LogDBResponse>> {
        let logs = sqlx::query_as::<_, Log>("SELECT id, type, user_id, body, created_at FROM logs ORDER BY id DESC LIMIT ?")
            .bind(limit)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(logs.into_iter().map(LogDBResponse::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::SqlitePool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_append_and_list(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Logs::new(&mut conn);

        for (user_id, body) in [(Some(1), "first"), (None, "second")] {
            repo.create(&LogCreateDBRequest {
                log_type: "Error".to_string(),
                user_id,
                body: body.to_string(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        }

        let logs = repo.list_recent(10).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].body, "second");
        assert_eq!(logs[0].user_id, None);
        assert_eq!(logs[1].body, "first");
        assert_eq!(logs[1].user_id, Some(1));
        assert!(logs.iter().all(|l| l.log_type == "Error"));

        assert_eq!(repo.list_recent(1).await.unwrap().len(), 1);
    }
}
