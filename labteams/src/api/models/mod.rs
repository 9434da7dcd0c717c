//! API request and response data models.
//!
//! API models are distinct from database models and carry the `utoipa` annotations used
//! for the OpenAPI document.
//!
//! - [`team_groups`]: the admin panel form, its parsed actions, and read responses
//! - [`users`]: the acting [`Principal`](users::Principal)

pub mod team_groups;
pub mod users;
