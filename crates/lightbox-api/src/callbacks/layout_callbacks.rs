//! Navigation and logout.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
};
use tower_sessions::Session;
use tracing::debug;

use lightbox_types::api::{NavigateRequest, NavigateResponse};
use lightbox_types::models::Identity;

use crate::layout::{self, LOGIN_PATH};
use crate::registry::{Registry, RegistryError};
use crate::state::{AppState, current_identity, with_session};

pub fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.callback("/_callbacks/navigate", post(navigate))?;
    registry.callback("/logout", get(logout))
}

async fn navigate(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<NavigateRequest>,
) -> Result<Json<NavigateResponse>, StatusCode> {
    if req.logout_clicks.unwrap_or(0) > 0 {
        with_session(&state, &session, |app, ctx| app.auth.logout(ctx)).await?;
        return Ok(Json(NavigateResponse {
            redirect: Some(LOGIN_PATH.to_string()),
            menu: layout::menu_state(&Identity::Anonymous),
        }));
    }

    let identity = current_identity(&state, &session).await?;
    let redirect = layout::resolve(&identity, &state.pages, &req.pathname).redirect();
    if let Some(target) = &redirect {
        debug!("Navigation to {} redirected to {}", req.pathname, target);
    }

    Ok(Json(NavigateResponse {
        redirect,
        menu: layout::menu_state(&identity),
    }))
}

async fn logout(State(state): State<AppState>, session: Session) -> Result<Redirect, StatusCode> {
    with_session(&state, &session, |app, ctx| app.auth.logout(ctx)).await?;
    Ok(Redirect::to(LOGIN_PATH))
}
