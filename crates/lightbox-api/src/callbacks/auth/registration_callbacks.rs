use axum::{Json, extract::State, http::StatusCode, routing::post};
use tracing::warn;

use lightbox_types::api::{RegisterFieldsRequest, RegisterFieldsResponse, RegisterRequest, RegisterResponse};

use crate::error::AuthError;
use crate::layout::LOGIN_PATH;
use crate::pages::{Page, PageLocation};
use crate::registry::{Registry, RegistryError};
use crate::state::{AppState, run_blocking};

const REGISTERED: &str = "Registration successful. You can now log in with your new account.";
const USERNAME_TAKEN: &str = "Username already exists";
const PASSWORD_MISMATCH: &str = "Passwords do not match";

const BODY: &str = r#"<h2>Register</h2>
<form onsubmit="return false">
  <input id="username" placeholder="Username" autocomplete="username">
  <div id="username-alert" role="alert"></div>
  <input id="password" type="password" placeholder="Password" autocomplete="new-password">
  <input id="confirm-password" type="password" placeholder="Confirm password" autocomplete="new-password">
  <div id="password-alert" role="alert"></div>
  <button id="register-button" disabled>Register</button>
</form>
<div id="register-alert" role="alert"></div>
<script>
const value = (id) => document.getElementById(id).value;
for (const id of ["username", "password", "confirm-password"]) {
  document.getElementById(id).addEventListener("input", async () => {
    const state = await callback("/register/validate", {
      username: value("username"),
      password: value("password"),
      confirm_password: value("confirm-password"),
    });
    document.getElementById("register-button").disabled = state.button_disabled;
    document.getElementById("username-alert").textContent = state.username_alert;
    document.getElementById("password-alert").textContent = state.password_alert;
  });
}
document.getElementById("register-button").addEventListener("click", async () => {
  const result = await callback("/register/submit", {
    username: value("username"),
    password: value("password"),
  });
  document.getElementById("register-alert").textContent = result.message;
  if (result.redirect) setTimeout(() => follow(result.redirect), 2000);
});
</script>"#;

pub fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.page(Page {
        path: "/register",
        name: "Register",
        location: PageLocation::Auth,
        body: BODY,
    })?;
    registry.callback("/_callbacks/register/validate", post(validate))?;
    registry.callback("/_callbacks/register/submit", post(submit))
}

async fn validate(
    State(state): State<AppState>,
    Json(req): Json<RegisterFieldsRequest>,
) -> Result<Json<RegisterFieldsResponse>, StatusCode> {
    let username = req.username.unwrap_or_default();
    let password = req.password.unwrap_or_default();
    let confirm = req.confirm_password.unwrap_or_default();

    let button_disabled = username.is_empty() || password.is_empty() || password != confirm;

    let password_alert = if !confirm.is_empty() && password != confirm {
        PASSWORD_MISMATCH.to_string()
    } else {
        String::new()
    };

    let username_alert = if username.is_empty() {
        String::new()
    } else {
        let worker = state.clone();
        match run_blocking(move || worker.auth.username_available(&username)).await? {
            Ok(true) => String::new(),
            Ok(false) => USERNAME_TAKEN.to_string(),
            Err(e) => {
                // Submit still enforces uniqueness.
                warn!("Username availability check failed: {}", e);
                String::new()
            }
        }
    };

    Ok(Json(RegisterFieldsResponse {
        button_disabled,
        username_alert,
        password_alert,
    }))
}

async fn submit(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, StatusCode> {
    let Some(password) = req.password else {
        return Ok(Json(RegisterResponse {
            message: AuthError::InvalidInput("Password empty".into()).user_message(),
            redirect: None,
        }));
    };

    let worker = state.clone();
    let username = req.username;
    let result = run_blocking(move || worker.auth.register(&username, &password)).await?;

    let response = match result {
        Ok(_) => RegisterResponse {
            message: REGISTERED.to_string(),
            redirect: Some(LOGIN_PATH.to_string()),
        },
        Err(e) => RegisterResponse {
            message: e.surface("registration"),
            redirect: None,
        },
    };
    Ok(Json(response))
}
