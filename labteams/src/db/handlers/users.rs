//! Database repository for users.
//!
//! Accounts are owned by the notebook; this repository only reads the columns needed to
//! resolve a principal, plus an insert used to bootstrap the first admin.

use crate::db::{
    errors::Result,
    models::users::{UserCreateDBRequest, UserDBResponse},
};
use crate::types::{TeamId, UserId};
use sqlx::{FromRow, SqliteConnection};
use tracing::instrument;

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct User {
    pub id: UserId,
    pub email: String,
    pub team: TeamId,
    pub is_admin: bool,
}

impl From<User> for UserDBResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            team: user.team,
            is_admin: user.is_admin,
        }
    }
}

pub struct Users<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(email = %request.email, team = request.team), err)]
    pub async fn create(&mut self, request: &UserCreateDBRequest) -> Result<UserDBResponse> {
        let user = sqlx::query_as::<_, User>("INSERT INTO users (email, team, is_admin) VALUES (?, ?, ?) RETURNING id, email, team, is_admin")
            .bind(&request.email)
            .bind(request.team)
            .bind(request.is_admin)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(UserDBResponse::from(user))
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_id(&mut self, id: UserId) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, User>("SELECT id, email, team, is_admin FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user.map(UserDBResponse::from))
    }

    #[instrument(skip(self), err)]
    pub async fn get_user_by_email(&mut self, email: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, User>("SELECT id, email, team, is_admin FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user.map(UserDBResponse::from))
    }
}
