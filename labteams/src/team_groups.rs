//! Team group entity manager.
//!
//! [`TeamGroupService`] is the only place that mutates `team_groups` and
//! `users2team_groups`. Every mutation takes the acting [`Principal`] and runs
//! [`require_team_admin`] before touching storage; reads are unguarded.
//!
//! Mutations report a three-way result: `Ok(Outcome::Applied(..))` when a row changed,
//! `Ok(Outcome::Unchanged)` when the statement matched nothing, and `Err(..)` on
//! authorization, argument or storage failure.

use std::collections::HashMap;

use sqlx::{Acquire, SqlitePool};
use tracing::{debug, instrument};

use crate::{
    api::models::users::Principal,
    auth::permissions::require_team_admin,
    db::{
        errors::DbError,
        handlers::{Repository, TeamGroups, team_groups::TeamGroupFilter},
        models::team_groups::{TeamGroupCreateDBRequest, TeamGroupDBResponse, TeamGroupUpdateDBRequest},
    },
    errors::{Error, Result},
    types::{ElementRef, GroupId, MemberAction, Operation, Outcome, Resource, TeamId, UserId},
};

#[derive(Debug, Clone)]
pub struct TeamGroupService {
    pool: SqlitePool,
}

impl TeamGroupService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a team group named `name` in `team`.
    #[instrument(skip(self, principal), fields(user_id = principal.id), err)]
    pub async fn create(&self, principal: &Principal, name: &str, team: TeamId) -> Result<Outcome<TeamGroupDBResponse>> {
        require_team_admin(principal, team, Operation::CreateAll, Resource::TeamGroups)?;

        let mut conn = self.pool.acquire().await.map_err(|e| Error::Database(e.into()))?;
        let request = TeamGroupCreateDBRequest {
            name: name.to_string(),
            team,
        };

        match TeamGroups::new(&mut conn).create(&request).await {
            Ok(group) => {
                debug!(group_id = group.id, "Created team group");
                Ok(Outcome::Applied(group))
            }
            Err(DbError::NotFound) => Ok(Outcome::Unchanged),
            Err(e) => Err(e.into()),
        }
    }

    /// All team groups of `team`, in storage order.
    #[instrument(skip(self), err)]
    pub async fn read(&self, team: TeamId) -> Result<Vec<TeamGroupDBResponse>> {
        let mut conn = self.pool.acquire().await.map_err(|e| Error::Database(e.into()))?;
        Ok(TeamGroups::new(&mut conn).list(&TeamGroupFilter::new(team)).await?)
    }

    #[instrument(skip(self), err)]
    pub async fn get(&self, group: GroupId) -> Result<Option<TeamGroupDBResponse>> {
        let mut conn = self.pool.acquire().await.map_err(|e| Error::Database(e.into()))?;
        Ok(TeamGroups::new(&mut conn).get_by_id(group).await?)
    }

    #[instrument(skip(self), err)]
    pub async fn read_name(&self, group: GroupId) -> Result<Option<String>> {
        let mut conn = self.pool.acquire().await.map_err(|e| Error::Database(e.into()))?;
        Ok(TeamGroups::new(&mut conn).get_name(group).await?)
    }

    #[instrument(skip(self), err)]
    pub async fn is_in_team_group(&self, user: UserId, group: GroupId) -> Result<bool> {
        let mut conn = self.pool.acquire().await.map_err(|e| Error::Database(e.into()))?;
        Ok(TeamGroups::new(&mut conn).is_member(user, group).await?)
    }

    /// Member ids of one group, ascending.
    #[instrument(skip(self), err)]
    pub async fn members(&self, group: GroupId) -> Result<Vec<UserId>> {
        let mut conn = self.pool.acquire().await.map_err(|e| Error::Database(e.into()))?;
        Ok(TeamGroups::new(&mut conn).get_group_users(group).await?)
    }

    /// Member ids of every group in `team`, keyed by group id. Groups without members are absent.
    #[instrument(skip(self), err)]
    pub async fn team_members(&self, team: TeamId) -> Result<HashMap<GroupId, Vec<UserId>>> {
        let mut conn = self.pool.acquire().await.map_err(|e| Error::Database(e.into()))?;
        Ok(TeamGroups::new(&mut conn).get_team_groups_users(team).await?)
    }

    /// Rename the group referenced by `target`.
    ///
    /// Returns `Ok(None)` without writing when `target` is not a team group reference.
    /// A rename that matches no row of `team` is an error.
    #[instrument(skip(self, principal, target), fields(user_id = principal.id, target = %target), err)]
    pub async fn update(&self, principal: &Principal, name: &str, target: &ElementRef, team: TeamId) -> Result<Option<String>> {
        require_team_admin(principal, team, Operation::UpdateAll, Resource::TeamGroups)?;

        let group_id = match target {
            ElementRef::TeamGroup(id) => *id,
            ElementRef::Unrecognized(raw) => {
                debug!("Ignoring rename of unrecognized element {raw:?}");
                return Ok(None);
            }
        };

        let mut conn = self.pool.acquire().await.map_err(|e| Error::Database(e.into()))?;
        let request = TeamGroupUpdateDBRequest {
            name: name.to_string(),
            team,
        };

        match TeamGroups::new(&mut conn).update(group_id, &request).await {
            Ok(group) => Ok(Some(group.name)),
            Err(DbError::NotFound) => Err(Error::Internal {
                operation: "update team group".to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Add `user` to, or remove them from, `group`.
    ///
    /// The group must belong to the principal's team.
    #[instrument(skip(self, principal), fields(user_id = principal.id), err)]
    pub async fn update_member(&self, principal: &Principal, user: UserId, group: GroupId, action: MemberAction) -> Result<Outcome> {
        require_team_admin(principal, principal.team, Operation::UpdateAll, Resource::Memberships)?;

        let mut conn = self.pool.acquire().await.map_err(|e| Error::Database(e.into()))?;
        let mut repo = TeamGroups::new(&mut conn);

        match repo.get_by_id(group).await? {
            Some(existing) if existing.team == principal.team => {}
            _ => {
                return Err(Error::NotFound {
                    resource: "Team group".to_string(),
                    id: group.to_string(),
                });
            }
        }

        let outcome = match action {
            MemberAction::Add => repo.add_user_to_group(user, group).await,
            MemberAction::Remove => repo.remove_user_from_group(user, group).await,
        };

        match outcome {
            Ok(outcome) => Ok(outcome),
            Err(DbError::ForeignKeyViolation { .. }) => Err(Error::NotFound {
                resource: "User".to_string(),
                id: user.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a group of the principal's team together with all of its memberships.
    ///
    /// Both deletes share one transaction. A group that does not exist in the
    /// principal's team is left alone and reported as `Unchanged`.
    #[instrument(skip(self, principal), fields(user_id = principal.id), err)]
    pub async fn destroy(&self, principal: &Principal, group: GroupId) -> Result<Outcome> {
        require_team_admin(principal, principal.team, Operation::DeleteAll, Resource::TeamGroups)?;

        let mut tx = self.pool.begin().await.map_err(|e| Error::Database(e.into()))?;
        {
            let mut repo = TeamGroups::new(tx.acquire().await.map_err(|e| Error::Database(e.into()))?);

            match repo.get_by_id(group).await? {
                Some(existing) if existing.team == principal.team => {}
                _ => return Ok(Outcome::Unchanged),
            }

            let removed = repo.remove_all_members(group).await?;
            debug!(group_id = group, memberships = removed, "Removed team group memberships");

            if !repo.delete(group).await? {
                return Err(Error::Internal {
                    operation: "remove team group".to_string(),
                });
            }
        }
        tx.commit().await.map_err(|e| Error::Database(e.into()))?;

        Ok(Outcome::Applied(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{add_user_to_group, create_test_admin, create_test_group, create_test_user, principal_for};

    async fn membership_rows(pool: &SqlitePool, group: GroupId) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM users2team_groups WHERE groupid = ?")
            .bind(group)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_then_read(pool: SqlitePool) {
        let admin = principal_for(&create_test_admin(&pool, 7).await);
        let service = TeamGroupService::new(pool);

        let group = service.create(&admin, "Biology", 7).await.unwrap().applied().unwrap();
        assert_eq!(group.name, "Biology");
        assert_eq!(group.team, 7);

        let groups = service.read(7).await.unwrap();
        assert!(groups.iter().any(|g| g.id == group.id && g.name == "Biology"));
        assert_eq!(service.read_name(group.id).await.unwrap().as_deref(), Some("Biology"));
        assert!(service.read(9).await.unwrap().is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_non_admin_mutations_are_rejected_without_writes(pool: SqlitePool) {
        let member = create_test_user(&pool, 7).await;
        let group = create_test_group(&pool, "Biology", 7).await;
        add_user_to_group(&pool, member.id, group.id).await;
        let principal = principal_for(&member);
        let service = TeamGroupService::new(pool.clone());

        let err = service.create(&principal, "Chemistry", 7).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientPermissions { .. }));

        let err = service
            .update(&principal, "Bio2", &ElementRef::TeamGroup(group.id), 7)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientPermissions { .. }));

        let err = service
            .update_member(&principal, member.id, group.id, MemberAction::Remove)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientPermissions { .. }));

        let err = service.destroy(&principal, group.id).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientPermissions { .. }));

        let groups = service.read(7).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "Biology");
        assert!(service.is_in_team_group(member.id, group.id).await.unwrap());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_rename_scoped_to_team(pool: SqlitePool) {
        let admin7 = principal_for(&create_test_admin(&pool, 7).await);
        let admin9 = principal_for(&create_test_admin(&pool, 9).await);
        let group = create_test_group(&pool, "Biology", 7).await;
        let service = TeamGroupService::new(pool);
        let target = ElementRef::parse(&format!("teamgroup_{}", group.id));

        let renamed = service.update(&admin7, "Bio2", &target, 7).await.unwrap();
        assert_eq!(renamed.as_deref(), Some("Bio2"));
        assert_eq!(service.read_name(group.id).await.unwrap().as_deref(), Some("Bio2"));

        // An admin of team 7 cannot act on team 9
        let err = service.update(&admin7, "Bio3", &target, 9).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientPermissions { .. }));

        // An admin of team 9 passes the guard but the row is not in team 9
        let err = service.update(&admin9, "Bio3", &target, 9).await.unwrap_err();
        assert!(matches!(err, Error::Internal { .. }));
        assert_eq!(service.read_name(group.id).await.unwrap().as_deref(), Some("Bio2"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_rename_of_unrecognized_element_is_a_no_op(pool: SqlitePool) {
        let admin = principal_for(&create_test_admin(&pool, 7).await);
        let group = create_test_group(&pool, "Biology", 7).await;
        let service = TeamGroupService::new(pool);

        for raw in ["experiment_1", "teamgroup_abc", "teamgroup_0", "bogus"] {
            let result = service.update(&admin, "Renamed", &ElementRef::parse(raw), 7).await.unwrap();
            assert_eq!(result, None, "{raw}");
        }
        assert_eq!(service.read_name(group.id).await.unwrap().as_deref(), Some("Biology"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_rename_of_missing_group_fails(pool: SqlitePool) {
        let admin = principal_for(&create_test_admin(&pool, 7).await);
        let service = TeamGroupService::new(pool);

        let err = service.update(&admin, "Ghost", &ElementRef::TeamGroup(999), 7).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to update team group");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_member_add_and_remove(pool: SqlitePool) {
        let admin = principal_for(&create_test_admin(&pool, 7).await);
        let user = create_test_user(&pool, 7).await;
        let group = create_test_group(&pool, "Biology", 7).await;
        let service = TeamGroupService::new(pool);

        let outcome = service.update_member(&admin, user.id, group.id, MemberAction::Add).await.unwrap();
        assert!(outcome.is_applied());
        assert!(service.is_in_team_group(user.id, group.id).await.unwrap());
        assert_eq!(service.members(group.id).await.unwrap(), vec![user.id]);

        // Adding twice leaves a single membership
        let outcome = service.update_member(&admin, user.id, group.id, MemberAction::Add).await.unwrap();
        assert_eq!(outcome, Outcome::Unchanged);
        assert_eq!(service.members(group.id).await.unwrap().len(), 1);

        let outcome = service.update_member(&admin, user.id, group.id, MemberAction::Remove).await.unwrap();
        assert!(outcome.is_applied());
        assert!(!service.is_in_team_group(user.id, group.id).await.unwrap());

        let outcome = service.update_member(&admin, user.id, group.id, MemberAction::Remove).await.unwrap();
        assert_eq!(outcome, Outcome::Unchanged);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_member_changes_require_group_in_principal_team(pool: SqlitePool) {
        let admin = principal_for(&create_test_admin(&pool, 7).await);
        let user = create_test_user(&pool, 9).await;
        let foreign = create_test_group(&pool, "Physics", 9).await;
        let service = TeamGroupService::new(pool);

        let err = service.update_member(&admin, user.id, foreign.id, MemberAction::Add).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert!(!service.is_in_team_group(user.id, foreign.id).await.unwrap());

        let err = service.update_member(&admin, user.id, 4242, MemberAction::Add).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_adding_unknown_user_is_not_found(pool: SqlitePool) {
        let admin = principal_for(&create_test_admin(&pool, 7).await);
        let group = create_test_group(&pool, "Biology", 7).await;
        let service = TeamGroupService::new(pool);

        let err = service.update_member(&admin, 4242, group.id, MemberAction::Add).await.unwrap_err();
        match err {
            Error::NotFound { resource, id } => {
                assert_eq!(resource, "User");
                assert_eq!(id, "4242");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_destroy_removes_group_and_memberships(pool: SqlitePool) {
        let admin = principal_for(&create_test_admin(&pool, 7).await);
        let alice = create_test_user(&pool, 7).await;
        let bob = create_test_user(&pool, 7).await;
        let doomed = create_test_group(&pool, "Biology", 7).await;
        let kept = create_test_group(&pool, "Chemistry", 7).await;
        add_user_to_group(&pool, alice.id, doomed.id).await;
        add_user_to_group(&pool, bob.id, doomed.id).await;
        add_user_to_group(&pool, alice.id, kept.id).await;
        let service = TeamGroupService::new(pool.clone());

        let outcome = service.destroy(&admin, doomed.id).await.unwrap();
        assert!(outcome.is_applied());

        let groups = service.read(7).await.unwrap();
        assert!(groups.iter().all(|g| g.id != doomed.id));
        assert!(groups.iter().any(|g| g.id == kept.id));
        assert_eq!(membership_rows(&pool, doomed.id).await, 0);
        assert_eq!(membership_rows(&pool, kept.id).await, 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_destroy_missing_or_foreign_group_is_unchanged(pool: SqlitePool) {
        let admin = principal_for(&create_test_admin(&pool, 7).await);
        let user = create_test_user(&pool, 9).await;
        let foreign = create_test_group(&pool, "Physics", 9).await;
        add_user_to_group(&pool, user.id, foreign.id).await;
        let service = TeamGroupService::new(pool.clone());

        assert_eq!(service.destroy(&admin, 4242).await.unwrap(), Outcome::Unchanged);
        assert_eq!(service.destroy(&admin, foreign.id).await.unwrap(), Outcome::Unchanged);
        assert_eq!(service.read(9).await.unwrap().len(), 1);
        assert_eq!(membership_rows(&pool, foreign.id).await, 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_destroy_rolls_back_memberships_when_group_delete_fails(pool: SqlitePool) {
        let admin = principal_for(&create_test_admin(&pool, 7).await);
        let alice = create_test_user(&pool, 7).await;
        let bob = create_test_user(&pool, 7).await;
        let group = create_test_group(&pool, "Biology", 7).await;
        add_user_to_group(&pool, alice.id, group.id).await;
        add_user_to_group(&pool, bob.id, group.id).await;

        sqlx::query("CREATE TRIGGER team_groups_locked BEFORE DELETE ON team_groups BEGIN SELECT RAISE(ABORT, 'locked'); END")
            .execute(&pool)
            .await
            .unwrap();
        let service = TeamGroupService::new(pool.clone());

        let err = service.destroy(&admin, group.id).await.unwrap_err();
        assert!(matches!(err, Error::Database(_)), "unexpected error: {err:?}");

        assert_eq!(membership_rows(&pool, group.id).await, 2);
        assert!(service.get(group.id).await.unwrap().is_some());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_destroy_rolls_back_when_group_row_is_not_deleted(pool: SqlitePool) {
        let admin = principal_for(&create_test_admin(&pool, 7).await);
        let alice = create_test_user(&pool, 7).await;
        let group = create_test_group(&pool, "Biology", 7).await;
        add_user_to_group(&pool, alice.id, group.id).await;

        // Skips the delete without an error, so the statement reports no affected row
        sqlx::query("CREATE TRIGGER team_groups_skip_delete BEFORE DELETE ON team_groups BEGIN SELECT RAISE(IGNORE); END")
            .execute(&pool)
            .await
            .unwrap();
        let service = TeamGroupService::new(pool.clone());

        let err = service.destroy(&admin, group.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to remove team group");

        assert_eq!(membership_rows(&pool, group.id).await, 1);
        assert!(service.is_in_team_group(alice.id, group.id).await.unwrap());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_team_members_groups_by_group(pool: SqlitePool) {
        let alice = create_test_user(&pool, 7).await;
        let bob = create_test_user(&pool, 7).await;
        let biology = create_test_group(&pool, "Biology", 7).await;
        let empty = create_test_group(&pool, "Empty", 7).await;
        add_user_to_group(&pool, bob.id, biology.id).await;
        add_user_to_group(&pool, alice.id, biology.id).await;
        let service = TeamGroupService::new(pool);

        let members = service.team_members(7).await.unwrap();
        assert_eq!(members.get(&biology.id), Some(&vec![alice.id, bob.id]));
        assert!(!members.contains_key(&empty.id));
        assert!(service.get(empty.id).await.unwrap().is_some());
    }
}
