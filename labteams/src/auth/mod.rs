//! Authentication and authorization.
//!
//! # Authentication
//!
//! Sessions and logins belong to the notebook in front of this service. Requests arrive
//! through a trusted proxy that names the acting user in a header (default
//! `x-labteams-user`, see [`crate::config::ProxyHeaderAuthConfig`]). The
//! [`Principal`](crate::api::models::users::Principal) extractor in [`current_user`]
//! resolves that id against the `users` table; a missing header or an unknown user is a
//! 401.
//!
//! # Authorization
//!
//! Every mutation of team groups or memberships requires the admin capability for the
//! team being acted on. [`permissions::require_team_admin`] is the single guard for that
//! and runs before any write. Reads are not guarded.
//!
//! ```ignore
//! use labteams::auth::permissions::require_team_admin;
//!
//! require_team_admin(&principal, team, Operation::CreateAll, Resource::TeamGroups)?;
//! ```

pub mod current_user;
pub mod permissions;
