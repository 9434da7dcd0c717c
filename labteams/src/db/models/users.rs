//! Database models for users.

use crate::types::{TeamId, UserId};

/// Database request for creating a new user
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub email: String,
    pub team: TeamId,
    pub is_admin: bool,
}

/// Database response for a user
#[derive(Debug, Clone)]
pub struct UserDBResponse {
    pub id: UserId,
    pub email: String,
    pub team: TeamId,
    pub is_admin: bool,
}
