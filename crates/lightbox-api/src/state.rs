use std::sync::Arc;

use axum::http::StatusCode;
use tower_sessions::Session;
use tracing::error;

use lightbox_types::models::Identity;

use crate::auth::Authenticator;
use crate::error::AuthError;
use crate::files::FileStore;
use crate::pages::PageTable;
use crate::session::SessionContext;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub auth: Arc<dyn Authenticator>,
    pub files: Arc<dyn FileStore>,
    pub pages: PageTable,
}

/// Run blocking work (SQLite, Argon2, filesystem) off the async runtime.
pub async fn run_blocking<F, T>(f: F) -> Result<T, StatusCode>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// Run `f` against the caller's session and persist whatever login or
/// logout it performed.
pub async fn with_session<F, T>(state: &AppState, session: &Session, f: F) -> Result<T, StatusCode>
where
    F: FnOnce(&AppStateInner, &mut SessionContext) -> T + Send + 'static,
    T: Send + 'static,
{
    let mut ctx = SessionContext::load(session).await;
    let worker = state.clone();
    let (ctx, out) = run_blocking(move || {
        let out = f(&worker, &mut ctx);
        (ctx, out)
    })
    .await?;

    ctx.apply(session).await.map_err(|e| {
        error!("Failed to persist session change: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(out)
}

pub async fn current_identity(state: &AppState, session: &Session) -> Result<Identity, StatusCode> {
    let ctx = SessionContext::load(session).await;
    if ctx.user_id().is_none() {
        return Ok(Identity::Anonymous);
    }
    let worker = state.clone();
    run_blocking(move || worker.auth.current_identity(&ctx)).await
}

/// Name of the signed-in user, or [`AuthError::Unauthenticated`].
pub fn require_user(identity: &Identity) -> Result<String, AuthError> {
    identity
        .username()
        .map(str::to_string)
        .ok_or(AuthError::Unauthenticated)
}
