//! # labteams: team groups for a laboratory notebook
//!
//! `labteams` manages **team groups**: named, team-scoped collections of users that the
//! notebook's admin panel creates, renames, fills and deletes. Every mutation requires the
//! acting user to be an admin of the team involved, checked before anything is written.
//!
//! ## Request Flow
//!
//! The notebook sits in front of this service, owns sessions, and forwards the acting user's
//! id in a trusted header (see [`auth`]). Two surfaces are exposed:
//!
//! - `POST /app/controllers/team-groups`: the form controller used by the admin panel. It
//!   picks the single action field in the form, runs one [`team_groups::TeamGroupService`]
//!   operation and answers with the legacy `1`/`0` body, or the new name after a rename.
//!   Failures never reach the browser: they are written to the [`audit`] log and the body
//!   is empty.
//! - `GET /api/v1/team-groups/*`: read-only JSON views of the caller's team.
//!
//! ## Core Components
//!
//! - [`team_groups`]: the entity manager, with the admin guard in front of every write
//! - [`db`]: repositories over SQLite connections, one per table family
//! - [`api`]: axum handlers and request/response models
//! - [`audit`]: where swallowed controller failures go
//! - [`config`] and [`telemetry`]: the ambient setup
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use labteams::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = labteams::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     labteams::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     }).await?;
//!
//!     Ok(())
//! }
//! ```
pub mod api;
pub mod audit;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod team_groups;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use crate::{
    audit::{AuditLog, DbAuditLog},
    db::{errors::DbError, handlers::Users, models::users::UserCreateDBRequest},
    openapi::ApiDoc,
};
use axum::{
    Json, Router,
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;

pub use types::{GroupId, TeamId, UserId};

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder()
///     .db(pool.clone())
///     .config(config)
///     .audit(Arc::new(DbAuditLog::new(pool)))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
    pub audit: Arc<dyn AuditLog>,
}

/// Get the labteams database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the configured admin user if no user with that email exists.
///
/// Returns the id of the new or existing user. An existing user is left untouched.
#[instrument(skip(db))]
pub async fn create_initial_admin_user(email: &str, team: TeamId, db: &SqlitePool) -> Result<UserId, DbError> {
    let mut tx = db.begin().await?;
    let mut user_repo = Users::new(&mut *tx);

    if let Some(existing_user) = user_repo.get_user_by_email(email).await? {
        tx.commit().await?;
        return Ok(existing_user.id);
    }

    let created_user = user_repo
        .create(&UserCreateDBRequest {
            email: email.to_string(),
            team,
            is_admin: true,
        })
        .await?;

    tx.commit().await?;
    info!(user_id = created_user.id, "Created initial admin user");
    Ok(created_user.id)
}

/// Connect to the configured database and run migrations.
pub async fn setup_database(config: &Config) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.database.url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let settings = &config.database.pool;
    let pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(settings.acquire_timeout())
        .idle_timeout(settings.idle_timeout())
        .max_lifetime(settings.max_lifetime())
        .connect_with(options)
        .await?;

    migrator().run(&pool).await?;

    if let Some(admin) = &config.initial_admin {
        create_initial_admin_user(&admin.email, admin.team, &pool).await?;
    }

    Ok(pool)
}

/// Build the application router with every route and the tracing layer.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/team-groups", get(api::handlers::team_groups::list_team_groups))
        .route("/team-groups/{group_id}", get(api::handlers::team_groups::get_team_group))
        .route(
            "/team-groups/{group_id}/members/{user_id}",
            get(api::handlers::team_groups::get_membership),
        );

    let router = Router::new()
        .route(
            "/app/controllers/team-groups",
            post(api::handlers::team_groups::team_groups_controller),
        )
        .nest("/api/v1", api_routes)
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .with_state(state);

    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
}

pub struct Application {
    router: Router,
    config: Config,
    pool: SqlitePool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting labteams with configuration: {:#?}", config);
        let pool = setup_database(&config).await?;
        Self::new_with_pool(config, pool).await
    }

    /// Create an application over an existing, already migrated pool
    pub async fn new_with_pool(config: Config, pool: SqlitePool) -> anyhow::Result<Self> {
        let state = AppState::builder()
            .db(pool.clone())
            .config(config.clone())
            .audit(Arc::new(DbAuditLog::new(pool.clone())) as Arc<dyn AuditLog>)
            .build();

        Ok(Self {
            router: build_router(state),
            config,
            pool,
        })
    }

    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("labteams listening on http://{}", bind_addr);

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InitialAdminConfig;

    #[sqlx::test]
    #[test_log::test]
    async fn test_initial_admin_is_idempotent(pool: SqlitePool) {
        let first = create_initial_admin_user("pi@lab.example", 7, &pool).await.unwrap();
        let second = create_initial_admin_user("pi@lab.example", 9, &pool).await.unwrap();
        assert_eq!(first, second);

        let mut conn = pool.acquire().await.unwrap();
        let user = Users::new(&mut conn).get_by_id(first).await.unwrap().unwrap();
        assert!(user.is_admin);
        assert_eq!(user.team, 7);
    }

    #[test_log::test(tokio::test)]
    async fn test_setup_database_bootstraps_admin() {
        let config = Config {
            database: config::DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                pool: config::PoolSettings {
                    max_connections: 1,
                    idle_timeout_secs: 0,
                    max_lifetime_secs: 0,
                    ..Default::default()
                },
            },
            initial_admin: Some(InitialAdminConfig {
                email: "pi@lab.example".to_string(),
                team: 3,
            }),
            ..Default::default()
        };

        let pool = setup_database(&config).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let admin = Users::new(&mut conn).get_user_by_email("pi@lab.example").await.unwrap().unwrap();
        assert!(admin.is_admin);
        assert_eq!(admin.team, 3);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unknown_route_is_not_found(pool: SqlitePool) {
        let server = Application::new_with_pool(Config::default(), pool)
            .await
            .unwrap()
            .into_test_server();

        server.get("/nope").await.assert_status_not_found();
    }
}
