use crate::{
    AppState,
    api::models::users::Principal,
    config::Config,
    db::{errors::DbError, handlers::Users},
    errors::{Error, Result},
    types::UserId,
};
use axum::{extract::FromRequestParts, http::request::Parts};
use sqlx::SqlitePool;
use tracing::{debug, instrument, trace};

/// Extract the principal from the trusted proxy header if present
/// Returns:
/// - None: No proxy header present
/// - Some(Ok(principal)): Header names a known user
/// - Some(Err(error)): Header present but malformed, or the user is unknown
#[instrument(skip(parts, config, db))]
async fn try_proxy_header_auth(parts: &Parts, config: &Config, db: &SqlitePool) -> Option<Result<Principal>> {
    let header_name = &config.auth.proxy_header.header_name;
    let raw = parts.headers.get(header_name.as_str())?;

    let user_id = match raw.to_str().ok().and_then(|s| s.trim().parse::<UserId>().ok()) {
        Some(id) => id,
        None => {
            return Some(Err(Error::Unauthenticated {
                message: Some(format!("Invalid {header_name} header")),
            }));
        }
    };

    let mut conn = match db.acquire().await {
        Ok(conn) => conn,
        Err(e) => return Some(Err(DbError::from(e).into())),
    };

    match Users::new(&mut conn).get_by_id(user_id).await {
        Ok(Some(user)) => Some(Ok(Principal::from(user))),
        Ok(None) => {
            trace!("Proxy header names unknown user {}", user_id);
            Some(Err(Error::Unauthenticated { message: None }))
        }
        Err(e) => Some(Err(Error::Database(e))),
    }
}

impl FromRequestParts<AppState> for Principal {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        match try_proxy_header_auth(parts, &state.config, &state.db).await {
            Some(Ok(principal)) => {
                debug!("Found proxy header authenticated user: {}", principal.id);
                Ok(principal)
            }
            Some(Err(e)) => Err(e),
            None => Err(Error::Unauthenticated { message: None }),
        }
    }
}
