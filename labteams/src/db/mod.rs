//! Database layer for data persistence and access.
//!
//! This module implements the data access layer using SQLx with SQLite.
//! It follows the Repository pattern to provide clean abstractions over database operations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │ Dispatcher  │  (api - form actions and read endpoints)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │  TeamGroups │  (team_groups - authorization guard + units of work)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - queries)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   SQLite    │
//! └─────────────┘
//! ```
//!
//! # Transactions
//!
//! Repositories borrow a `SqliteConnection`, so they work equally on a pooled connection
//! (reads) and on a transaction (multi-statement writes):
//!
//! ```ignore
//! let mut tx = pool.begin().await?;
//! let mut repo = TeamGroups::new(&mut tx);
//! // ... operations ...
//! tx.commit().await?;
//! ```
//!
//! # Migrations
//!
//! Migrations live in `migrations/` and are embedded at compile time; see [`crate::migrator`].

pub mod errors;
pub mod handlers;
pub mod models;
