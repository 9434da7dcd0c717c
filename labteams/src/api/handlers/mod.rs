//! HTTP request handlers.
//!
//! - [`team_groups`]: the form controller plus the read-only team group views
//!
//! Every handler takes a [`Principal`](crate::api::models::users::Principal), resolved
//! from the trusted proxy header by [`crate::auth::current_user`].

pub mod team_groups;
