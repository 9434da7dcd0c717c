//! Database repository for team groups and their memberships.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::team_groups::{TeamGroupCreateDBRequest, TeamGroupDBResponse, TeamGroupUpdateDBRequest},
};
use crate::types::{GroupId, Outcome, TeamId, UserId};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection};
use std::collections::HashMap;
use tracing::instrument;

/// Filter for listing team groups. Listings are always scoped to one team.
#[derive(Debug, Clone)]
pub struct TeamGroupFilter {
    pub team: TeamId,
}

impl TeamGroupFilter {
    pub fn new(team: TeamId) -> Self {
        Self { team }
    }
}

// Database entity model
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
struct TeamGroup {
    pub id: GroupId,
    pub name: String,
    pub team: TeamId,
}

pub struct TeamGroups<'c> {
    db: &'c mut SqliteConnection,
}

impl From<TeamGroup> for TeamGroupDBResponse {
    fn from(group: TeamGroup) -> Self {
        Self {
            id: group.id,
            name: group.name,
            team: group.team,
        }
    }
}

#[async_trait::async_trait]
impl<'c> Repository for TeamGroups<'c> {
    type CreateRequest = TeamGroupCreateDBRequest;
    type UpdateRequest = TeamGroupUpdateDBRequest;
    type Response = TeamGroupDBResponse;
    type Id = GroupId;
    type Filter = TeamGroupFilter;

    #[instrument(skip(self, request), fields(name = %request.name, team = request.team), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let group = sqlx::query_as::<_, TeamGroup>("INSERT INTO team_groups (name, team) VALUES (?, ?) RETURNING id, name, team")
            .bind(&request.name)
            .bind(request.team)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(TeamGroupDBResponse::from(group))
    }

    #[instrument(skip(self), fields(group_id = id), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let group = sqlx::query_as::<_, TeamGroup>("SELECT id, name, team FROM team_groups WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(group.map(TeamGroupDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(team = filter.team), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        // No ORDER BY: callers get storage order
        let groups = sqlx::query_as::<_, TeamGroup>("SELECT id, name, team FROM team_groups WHERE team = ?")
            .bind(filter.team)
            .fetch_all(&mut *self.db)
            .await?;

        tracing::debug!("Retrieved {} team groups for team {}", groups.len(), filter.team);

        Ok(groups.into_iter().map(TeamGroupDBResponse::from).collect())
    }

    #[instrument(skip(self), fields(group_id = id), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM team_groups WHERE id = ?")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(group_id = id, team = request.team), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        // Team is matched as well as id: a group of another team is reported as missing
        let group = sqlx::query_as::<_, TeamGroup>("UPDATE team_groups SET name = ? WHERE id = ? AND team = ? RETURNING id, name, team")
            .bind(&request.name)
            .bind(id)
            .bind(request.team)
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)?;

        Ok(TeamGroupDBResponse::from(group))
    }
}

impl<'c> TeamGroups<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(group_id = id), err)]
    pub async fn get_name(&mut self, id: GroupId) -> Result<Option<String>> {
        let name = sqlx::query_scalar::<_, String>("SELECT name FROM team_groups WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(name)
    }

    #[instrument(skip(self), err)]
    pub async fn is_member(&mut self, user_id: UserId, group_id: GroupId) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, i64>("SELECT EXISTS(SELECT 1 FROM users2team_groups WHERE userid = ? AND groupid = ?)")
            .bind(user_id)
            .bind(group_id)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(exists != 0)
    }

    #[instrument(skip(self), err)]
    pub async fn add_user_to_group(&mut self, user_id: UserId, group_id: GroupId) -> Result<Outcome> {
        let result = sqlx::query("INSERT INTO users2team_groups (userid, groupid) VALUES (?, ?) ON CONFLICT DO NOTHING")
            .bind(user_id)
            .bind(group_id)
            .execute(&mut *self.db)
            .await?;

        Ok(Outcome::from_rows_affected(result.rows_affected()))
    }

    #[instrument(skip(self), err)]
    pub async fn remove_user_from_group(&mut self, user_id: UserId, group_id: GroupId) -> Result<Outcome> {
        let result = sqlx::query("DELETE FROM users2team_groups WHERE userid = ? AND groupid = ?")
            .bind(user_id)
            .bind(group_id)
            .execute(&mut *self.db)
            .await?;

        Ok(Outcome::from_rows_affected(result.rows_affected()))
    }

    /// Drop every membership of a group, returning how many rows went.
    #[instrument(skip(self), err)]
    pub async fn remove_all_members(&mut self, group_id: GroupId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM users2team_groups WHERE groupid = ?")
            .bind(group_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self), err)]
    pub async fn get_group_users(&mut self, group_id: GroupId) -> Result<Vec<UserId>> {
        let users = sqlx::query_scalar::<_, UserId>("SELECT userid FROM users2team_groups WHERE groupid = ? ORDER BY userid")
            .bind(group_id)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(users)
    }

    // Bulk relationship fetching to avoid N+1 queries when listing a team

    #[instrument(skip(self), err)]
    pub async fn get_team_groups_users(&mut self, team: TeamId) -> Result<HashMap<GroupId, Vec<UserId>>> {
        let rows = sqlx::query_as::<_, (GroupId, UserId)>(
            r#"
            SELECT m.groupid, m.userid FROM users2team_groups m
            INNER JOIN team_groups g ON g.id = m.groupid
            WHERE g.team = ?
            ORDER BY m.groupid, m.userid
            "#,
        )
        .bind(team)
        .fetch_all(&mut *self.db)
        .await?;

        let mut result: HashMap<GroupId, Vec<UserId>> = HashMap::new();
        for (group_id, user_id) in rows {
            result.entry(group_id).or_default().push(user_id);
        }

        Ok(result)
    }
}
