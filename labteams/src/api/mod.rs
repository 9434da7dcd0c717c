//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures
//!
//! # API Structure
//!
//! - **Controller** (`POST /app/controllers/team-groups`): the form endpoint used by the
//!   notebook's admin panel. Answers `1`/`0`, a new name, or an empty body.
//! - **Team groups** (`/api/v1/team-groups/*`): read-only JSON views of the caller's team.
//! - **OpenAPI** (`/openapi.json`): generated with `utoipa`.

pub mod handlers;
pub mod models;
