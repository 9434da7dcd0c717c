//! API models for the acting user.

use crate::db::models::users::UserDBResponse;
use crate::types::{TeamId, UserId};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The principal a request executes on behalf of.
///
/// Resolved once per request (see [`crate::auth::current_user`]) and passed explicitly to
/// every mutating team group operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Principal {
    pub id: UserId,
    pub email: String,
    /// Team the principal is currently acting in
    pub team: TeamId,
    /// Admin capability for `team`
    pub is_admin: bool,
}

impl From<UserDBResponse> for Principal {
    fn from(user: UserDBResponse) -> Self {
        Self {
            id: user.id,
            email: user.email,
            team: user.team,
            is_admin: user.is_admin,
        }
    }
}
