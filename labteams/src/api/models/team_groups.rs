//! API request/response models for team groups.

use crate::db::models::team_groups::TeamGroupDBResponse;
use crate::errors::{Error, Result};
use crate::types::{ElementRef, GroupId, MemberAction, Operation, Resource, TeamId, UserId};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Form body posted by the notebook's team group admin panel.
///
/// Exactly one action field (`teamGroupsCreate`, `teamGroupsUpdateName`,
/// `teamGroupsUpdateMember`, `teamGroupsDestroy`) selects the operation; its value is
/// ignored except for `teamGroupsUpdateName`, which carries the new name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamGroupsForm {
    pub team_groups_create: Option<String>,
    pub team_groups_name: Option<String>,

    pub team_groups_update_name: Option<String>,
    /// Element id of the renamed group, e.g. `teamgroup_5`
    pub team_groups_id: Option<String>,

    pub team_groups_update_member: Option<String>,
    pub team_groups_user: Option<String>,
    pub team_groups_group: Option<String>,
    /// `add` or `rm`
    pub team_groups_action: Option<String>,

    pub team_groups_destroy: Option<String>,
}

/// A single operation selected from a [`TeamGroupsForm`], with its arguments parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeamGroupAction {
    Create { name: String },
    Rename { name: String, target: ElementRef },
    UpdateMember { user: UserId, group: GroupId, action: MemberAction },
    Destroy { group: GroupId },
}

fn required<'a>(field: &'static str, value: &'a Option<String>) -> Result<&'a str> {
    value.as_deref().ok_or_else(|| Error::BadRequest {
        message: format!("Missing field {field}"),
    })
}

fn required_id(field: &'static str, value: &Option<String>) -> Result<i64> {
    required(field, value)?.trim().parse::<i64>().map_err(|_| Error::BadRequest {
        message: format!("Invalid {field}"),
    })
}

impl TeamGroupsForm {
    /// Operation named by the first action field present, before any argument is read.
    pub fn requested_operation(&self) -> Option<(Operation, Resource)> {
        if self.team_groups_create.is_some() {
            Some((Operation::CreateAll, Resource::TeamGroups))
        } else if self.team_groups_update_name.is_some() {
            Some((Operation::UpdateAll, Resource::TeamGroups))
        } else if self.team_groups_update_member.is_some() {
            Some((Operation::UpdateAll, Resource::Memberships))
        } else if self.team_groups_destroy.is_some() {
            Some((Operation::DeleteAll, Resource::TeamGroups))
        } else {
            None
        }
    }

    /// Select and parse the requested action.
    ///
    /// `Ok(None)` when no action field is present; more than one action field is a
    /// `BadRequest`.
    pub fn into_action(self) -> Result<Option<TeamGroupAction>> {
        let present = [
            self.team_groups_create.is_some(),
            self.team_groups_update_name.is_some(),
            self.team_groups_update_member.is_some(),
            self.team_groups_destroy.is_some(),
        ]
        .into_iter()
        .filter(|p| *p)
        .count();

        if present > 1 {
            return Err(Error::BadRequest {
                message: "Only one team group action is allowed per request".to_string(),
            });
        }

        if self.team_groups_create.is_some() {
            let name = required("teamGroupsName", &self.team_groups_name)?;
            return Ok(Some(TeamGroupAction::Create { name: name.to_string() }));
        }

        if let Some(name) = &self.team_groups_update_name {
            let target = ElementRef::parse(required("teamGroupsId", &self.team_groups_id)?);
            return Ok(Some(TeamGroupAction::Rename {
                name: name.clone(),
                target,
            }));
        }

        if self.team_groups_update_member.is_some() {
            let user = required_id("teamGroupsUser", &self.team_groups_user)?;
            let group = required_id("teamGroupsGroup", &self.team_groups_group)?;
            let action = required("teamGroupsAction", &self.team_groups_action)?.parse::<MemberAction>()?;
            return Ok(Some(TeamGroupAction::UpdateMember { user, group, action }));
        }

        if self.team_groups_destroy.is_some() {
            let group = required_id("teamGroupsGroup", &self.team_groups_group)?;
            return Ok(Some(TeamGroupAction::Destroy { group }));
        }

        Ok(None)
    }
}

/// Query parameters for listing team groups
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListTeamGroupsQuery {
    /// Include related data (only "users" is recognized)
    pub include: Option<String>,
}

impl ListTeamGroupsQuery {
    pub fn include_users(&self) -> bool {
        self.include
            .as_deref()
            .is_some_and(|include| include.split(',').any(|part| part.trim() == "users"))
    }
}

/// Team group as returned by the read API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TeamGroupResponse {
    pub id: GroupId,
    pub name: String,
    pub team: TeamId,
    /// Member user ids (only included if `include=users` is specified)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<UserId>>,
}

impl From<TeamGroupDBResponse> for TeamGroupResponse {
    fn from(db: TeamGroupDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            team: db.team,
            users: None,
        }
    }
}

impl TeamGroupResponse {
    pub fn with_users(mut self, users: Vec<UserId>) -> Self {
        self.users = Some(users);
        self
    }
}

/// Whether a user belongs to a team group.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MembershipResponse {
    pub group_id: GroupId,
    pub user_id: UserId,
    pub member: bool,
}
