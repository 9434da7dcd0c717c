//! Authorization guard shared by every mutating team group operation.

use crate::api::models::users::Principal;
use crate::errors::{Error, Result};
use crate::types::{Operation, Permission, Resource, TeamId};

/// True if the principal holds the admin capability for `team`.
pub fn is_team_admin(principal: &Principal, team: TeamId) -> bool {
    principal.is_admin && principal.team == team
}

/// Fail with [`Error::InsufficientPermissions`] unless the principal is an admin of `team`.
///
/// Must run before any write.
pub fn require_team_admin(principal: &Principal, team: TeamId, action: Operation, resource: Resource) -> Result<()> {
    if is_team_admin(principal, team) {
        Ok(())
    } else {
        tracing::debug!(
            user_id = principal.id,
            principal_team = principal.team,
            team,
            "Rejected {action} on {resource}: not a team admin"
        );
        Err(Error::InsufficientPermissions {
            required: Permission::TeamAdmin(team),
            action,
            resource,
        })
    }
}
