use crate::api::models::team_groups::{ListTeamGroupsQuery, MembershipResponse, TeamGroupAction, TeamGroupResponse, TeamGroupsForm};
use crate::api::models::users::Principal;
use crate::audit::AuditEntry;
use crate::auth::permissions::require_team_admin;
use crate::db::models::team_groups::TeamGroupDBResponse;
use crate::errors::{Error, Result};
use crate::team_groups::TeamGroupService;
use crate::{
    AppState,
    types::{GroupId, UserId},
};
use axum::{
    Form, Json,
    extract::{Path, Query, State, rejection::FormRejection},
};

/// Legacy boolean answer of the form controller.
fn answer(applied: bool) -> String {
    let body = if applied { "1" } else { "0" };
    body.to_string()
}

async fn dispatch(service: &TeamGroupService, principal: &Principal, form: TeamGroupsForm) -> Result<String> {
    // Admin check comes before field validation
    if let Some((operation, resource)) = form.requested_operation() {
        require_team_admin(principal, principal.team, operation, resource)?;
    }

    let Some(action) = form.into_action()? else {
        return Ok(String::new());
    };

    match action {
        TeamGroupAction::Create { name } => {
            let outcome = service.create(principal, &name, principal.team).await?;
            Ok(answer(outcome.is_applied()))
        }
        TeamGroupAction::Rename { name, target } => Ok(service.update(principal, &name, &target, principal.team).await?.unwrap_or_default()),
        TeamGroupAction::UpdateMember { user, group, action } => {
            service.update_member(principal, user, group, action).await?;
            Ok(answer(true))
        }
        TeamGroupAction::Destroy { group } => {
            service.destroy(principal, group).await?;
            Ok(answer(true))
        }
    }
}

/// Form controller for the team group admin panel.
///
/// Always answers 200 once the principal is resolved. Failures, including form bodies
/// that cannot be decoded, are recorded in the audit log and produce an empty body.
#[utoipa::path(
    post,
    path = "/app/controllers/team-groups",
    tag = "controllers",
    summary = "Team group form controller",
    request_body(content = TeamGroupsForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "`1` or `0`, the new name after a rename, or empty on failure", body = String),
        (status = 401, description = "Unauthorized"),
    ),
    security(
        ("X-Labteams-User" = [])
    )
)]
#[tracing::instrument(skip_all, fields(user_id = principal.id))]
pub async fn team_groups_controller(
    State(state): State<AppState>,
    principal: Principal,
    form: std::result::Result<Form<TeamGroupsForm>, FormRejection>,
) -> String {
    let service = TeamGroupService::new(state.db.clone());

    let result = match form {
        Ok(Form(form)) => dispatch(&service, &principal, form).await,
        Err(rejection) => Err(Error::BadRequest {
            message: rejection.body_text(),
        }),
    };

    match result {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!("Team group request failed: {e}");
            if let Err(audit_err) = state.audit.record(AuditEntry::error(Some(principal.id), e.to_string())).await {
                tracing::error!("Failed to record audit entry: {audit_err}");
            }
            String::new()
        }
    }
}

/// Fetch a group, treating groups of other teams as missing.
async fn team_group_in_team(service: &TeamGroupService, principal: &Principal, group_id: GroupId) -> Result<TeamGroupDBResponse> {
    match service.get(group_id).await? {
        Some(group) if group.team == principal.team => Ok(group),
        _ => Err(Error::NotFound {
            resource: "Team group".to_string(),
            id: group_id.to_string(),
        }),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/team-groups",
    tag = "team_groups",
    summary = "List team groups",
    description = "Team groups of the caller's team, in storage order.",
    params(ListTeamGroupsQuery),
    responses(
        (status = 200, description = "List of team groups", body = Vec<TeamGroupResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("X-Labteams-User" = [])
    )
)]
#[tracing::instrument(skip_all, fields(user_id = principal.id))]
pub async fn list_team_groups(
    State(state): State<AppState>,
    Query(query): Query<ListTeamGroupsQuery>,
    principal: Principal,
) -> Result<Json<Vec<TeamGroupResponse>>> {
    let service = TeamGroupService::new(state.db.clone());
    let groups = service.read(principal.team).await?;

    let response = if query.include_users() {
        let mut members = service.team_members(principal.team).await?;
        groups
            .into_iter()
            .map(|group| {
                let users = members.remove(&group.id).unwrap_or_default();
                TeamGroupResponse::from(group).with_users(users)
            })
            .collect()
    } else {
        groups.into_iter().map(TeamGroupResponse::from).collect()
    };

    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/v1/team-groups/{group_id}",
    tag = "team_groups",
    summary = "Get team group",
    params(
        ("group_id" = i64, Path, description = "Team group ID"),
    ),
    responses(
        (status = 200, description = "Team group details", body = TeamGroupResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Team group not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("X-Labteams-User" = [])
    )
)]
#[tracing::instrument(skip_all, fields(user_id = principal.id))]
pub async fn get_team_group(
    State(state): State<AppState>,
    Path(group_id): Path<GroupId>,
    principal: Principal,
) -> Result<Json<TeamGroupResponse>> {
    let service = TeamGroupService::new(state.db.clone());
    let group = team_group_in_team(&service, &principal, group_id).await?;
    Ok(Json(TeamGroupResponse::from(group)))
}

#[utoipa::path(
    get,
    path = "/api/v1/team-groups/{group_id}/members/{user_id}",
    tag = "team_groups",
    summary = "Check team group membership",
    params(
        ("group_id" = i64, Path, description = "Team group ID"),
        ("user_id" = i64, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "Membership status", body = MembershipResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Team group not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("X-Labteams-User" = [])
    )
)]
#[tracing::instrument(skip_all, fields(user_id = principal.id))]
pub async fn get_membership(
    State(state): State<AppState>,
    Path((group_id, user_id)): Path<(GroupId, UserId)>,
    principal: Principal,
) -> Result<Json<MembershipResponse>> {
    let service = TeamGroupService::new(state.db.clone());
    team_group_in_team(&service, &principal, group_id).await?;
    let member = service.is_in_team_group(user_id, group_id).await?;

    Ok(Json(MembershipResponse { group_id, user_id, member }))
}
