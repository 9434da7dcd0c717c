//! Database record models matching table schemas.
//!
//! This module contains struct definitions that directly correspond to database
//! table rows. These models are used by repositories to return query results
//! and accept insertion/update data.
//!
//! Database models are distinct from API models so that storage and the HTTP
//! representation can evolve independently; API models implement `From` for the
//! matching `*DBResponse`.
//!
//! - [`team_groups`]: Team groups (memberships are plain id pairs and have no model)
//! - [`users`]: The slice of a user account needed to resolve a principal
//! - [`logs`]: Audit log rows

pub mod logs;
pub mod team_groups;
pub mod users;
