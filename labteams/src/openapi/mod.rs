//! OpenAPI documentation for the controller and read API, served at `/openapi.json`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

use crate::api;

/// Security scheme for the trusted proxy header.
struct ProxyHeaderSecurityAddon;

impl Modify for ProxyHeaderSecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "X-Labteams-User".to_string(),
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    "x-labteams-user",
                    "Numeric id of the acting user, set by the notebook's trusted proxy",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::team_groups::team_groups_controller,
        api::handlers::team_groups::list_team_groups,
        api::handlers::team_groups::get_team_group,
        api::handlers::team_groups::get_membership,
    ),
    components(schemas(
        api::models::team_groups::TeamGroupsForm,
        api::models::team_groups::TeamGroupResponse,
        api::models::team_groups::MembershipResponse,
        api::models::users::Principal,
    )),
    modifiers(&ProxyHeaderSecurityAddon),
    tags(
        (name = "controllers", description = "Form controllers used by the notebook UI"),
        (name = "team_groups", description = "Team group read API"),
    ),
    info(title = "labteams", description = "Team groups of a laboratory notebook")
)]
pub struct ApiDoc;
