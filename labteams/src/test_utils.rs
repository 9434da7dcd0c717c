//! Test helpers: fixture rows and a ready-made test server over a `#[sqlx::test]` pool.

use crate::api::models::users::Principal;
use crate::config::{Config, ProxyHeaderAuthConfig};
use crate::db::handlers::{Repository, TeamGroups, Users};
use crate::db::models::team_groups::{TeamGroupCreateDBRequest, TeamGroupDBResponse};
use crate::db::models::users::{UserCreateDBRequest, UserDBResponse};
use crate::types::{GroupId, TeamId, UserId};
use axum_test::TestServer;
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicU64, Ordering};

static USER_COUNTER: AtomicU64 = AtomicU64::new(0);

pub fn create_test_config() -> Config {
    Config::default()
}

pub async fn create_test_app(pool: SqlitePool) -> TestServer {
    crate::Application::new_with_pool(create_test_config(), pool)
        .await
        .expect("Failed to create application")
        .into_test_server()
}

async fn create_user(pool: &SqlitePool, team: TeamId, is_admin: bool) -> UserDBResponse {
    let n = USER_COUNTER.fetch_add(1, Ordering::Relaxed);
    let role = if is_admin { "admin" } else { "user" };
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");

    Users::new(&mut conn)
        .create(&UserCreateDBRequest {
            email: format!("{role}{n}@team{team}.lab.example"),
            team,
            is_admin,
        })
        .await
        .expect("Failed to create test user")
}

pub async fn create_test_user(pool: &SqlitePool, team: TeamId) -> UserDBResponse {
    create_user(pool, team, false).await
}

pub async fn create_test_admin(pool: &SqlitePool, team: TeamId) -> UserDBResponse {
    create_user(pool, team, true).await
}

pub async fn create_test_group(pool: &SqlitePool, name: &str, team: TeamId) -> TeamGroupDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    TeamGroups::new(&mut conn)
        .create(&TeamGroupCreateDBRequest {
            name: name.to_string(),
            team,
        })
        .await
        .expect("Failed to create test group")
}

pub async fn add_user_to_group(pool: &SqlitePool, user_id: UserId, group_id: GroupId) {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    TeamGroups::new(&mut conn)
        .add_user_to_group(user_id, group_id)
        .await
        .expect("Failed to add user to group");
}

pub fn principal_for(user: &UserDBResponse) -> Principal {
    Principal::from(user.clone())
}

/// Proxy header identifying `user`, as the notebook would send it.
pub fn user_header(user: &UserDBResponse) -> (String, String) {
    (ProxyHeaderAuthConfig::default().header_name, user.id.to_string())
}
