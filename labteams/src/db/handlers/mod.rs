//! Repository implementations for database access.
//!
//! Each repository wraps a SQLx connection (or a transaction dereferenced to one), binds
//! parameters for its statements and returns models from [`crate::db::models`].
//!
//! # Available Repositories
//!
//! - [`TeamGroups`]: Team groups and user memberships
//! - [`Users`]: Principal lookup and admin bootstrap
//! - [`Logs`]: Audit log rows
//!
//! # Common Pattern
//!
//! ```ignore
//! use labteams::db::handlers::{Repository, TeamGroups, team_groups::TeamGroupFilter};
//! use sqlx::Acquire;
//!
//! async fn example(pool: &sqlx::SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut tx = pool.begin().await?;
//!     let mut repo = TeamGroups::new(tx.acquire().await?);
//!
//!     let groups = repo.list(&TeamGroupFilter::new(7)).await?;
//!     repo.remove_all_members(groups[0].id).await?;
//!
//!     tx.commit().await?;
//!     Ok(())
//! }
//! ```

pub mod logs;
pub mod repository;
pub mod team_groups;
pub mod users;

pub use logs::Logs;
pub use repository::Repository;
pub use team_groups::TeamGroups;
pub use users::Users;
