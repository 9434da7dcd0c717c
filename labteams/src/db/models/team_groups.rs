//! Database models for team groups.

use crate::types::{GroupId, TeamId};

/// Database request for creating a new team group
#[derive(Debug, Clone)]
pub struct TeamGroupCreateDBRequest {
    pub name: String,
    pub team: TeamId,
}

/// Database request for renaming a team group.
///
/// The team is part of the request so the UPDATE only ever matches a group of that team.
#[derive(Debug, Clone)]
pub struct TeamGroupUpdateDBRequest {
    pub name: String,
    pub team: TeamId,
}

/// Database response for a team group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamGroupDBResponse {
    pub id: GroupId,
    pub name: String,
    pub team: TeamId,
}
