use axum::{Json, extract::State, http::StatusCode, routing::post};
use tower_sessions::Session;

use lightbox_types::api::{AlertColor, ButtonState, LoginFieldsRequest, LoginRequest, LoginResponse};

use crate::layout::MAIN_PATH;
use crate::pages::{Page, PageLocation};
use crate::registry::{Registry, RegistryError};
use crate::state::{AppState, with_session};

const LOGIN_SUCCESS: &str = "Login successful. Redirecting...";

const BODY: &str = r#"<h2>Login</h2>
<form onsubmit="return false">
  <input id="username" placeholder="Username" autocomplete="username">
  <input id="password" type="password" placeholder="Password" autocomplete="current-password">
  <button id="login-button" disabled>Login</button>
</form>
<p>No account yet? <a href="/register">Register</a></p>
<div id="login-alert" role="alert"></div>
<script>
const loginFields = () => ({
  username: document.getElementById("username").value,
  password: document.getElementById("password").value,
});
for (const id of ["username", "password"]) {
  document.getElementById(id).addEventListener("input", async () => {
    const state = await callback("/login/validate", loginFields());
    document.getElementById("login-button").disabled = state.disabled;
  });
}
document.getElementById("login-button").addEventListener("click", async () => {
  const result = await callback("/login/submit", loginFields());
  const alert = document.getElementById("login-alert");
  alert.textContent = result.message;
  alert.className = "alert-" + result.color;
  if (result.redirect) setTimeout(() => follow(result.redirect), 1000);
});
</script>"#;

pub fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.page(Page {
        path: "/login",
        name: "Login",
        location: PageLocation::Auth,
        body: BODY,
    })?;
    registry.callback("/_callbacks/login/validate", post(validate))?;
    registry.callback("/_callbacks/login/submit", post(submit))
}

fn filled(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|value| !value.is_empty())
}

async fn validate(Json(req): Json<LoginFieldsRequest>) -> Json<ButtonState> {
    Json(ButtonState {
        disabled: !(filled(&req.username) && filled(&req.password)),
    })
}

async fn submit(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, StatusCode> {
    let result = with_session(&state, &session, move |app, ctx| {
        app.auth.authenticate(ctx, &req.username, &req.password)
    })
    .await?;

    let response = match result {
        Ok(_) => LoginResponse {
            message: LOGIN_SUCCESS.to_string(),
            color: AlertColor::Success,
            redirect: Some(MAIN_PATH.to_string()),
        },
        Err(e) => LoginResponse {
            message: e.surface("login"),
            color: AlertColor::Danger,
            redirect: None,
        },
    };
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::testing::{FakeAuthenticator, TestApp};

    #[tokio::test]
    async fn button_enabled_only_with_both_fields() {
        let app = TestApp::new();
        let cases = [
            (json!({}), true),
            (json!({ "username": "ada" }), true),
            (json!({ "username": "ada", "password": "" }), true),
            (json!({ "username": "", "password": "pw" }), true),
            (json!({ "username": "ada", "password": "pw" }), false),
        ];
        for (body, disabled) in cases {
            let response = app.post("/_callbacks/login/validate", None, body.clone()).await;
            assert_eq!(response.json()["disabled"], disabled, "{body}");
        }
    }

    #[tokio::test]
    async fn successful_login_sets_cookie_and_redirects() {
        let app = TestApp::with_auth(FakeAuthenticator::with_user("testuser", "testpassword"));
        let response = app
            .post(
                "/_callbacks/login/submit",
                None,
                json!({ "username": "testuser", "password": "testpassword" }),
            )
            .await;

        assert_eq!(response.status, StatusCode::OK);
        let cookie = response.session_cookie().unwrap();
        assert!(cookie.starts_with("lightbox_session="));
        assert!(cookie.len() > "lightbox_session=".len());

        let body = response.json();
        assert_eq!(body["message"], "Login successful. Redirecting...");
        assert_eq!(body["color"], "success");
        assert_eq!(body["redirect"], "/select-images");
    }

    #[tokio::test]
    async fn failed_login_sets_no_cookie() {
        let app = TestApp::with_auth(FakeAuthenticator::with_user("testuser", "testpassword"));
        for (username, password) in [("testuser", "wrongpassword"), ("nobody", "testpassword"), ("", "")] {
            let response = app
                .post(
                    "/_callbacks/login/submit",
                    None,
                    json!({ "username": username, "password": password }),
                )
                .await;

            assert_eq!(response.session_cookie(), None);
            let body = response.json();
            assert_eq!(body["message"], "Invalid username or password.");
            assert_eq!(body["color"], "danger");
            assert!(body["redirect"].is_null());
        }
    }

    #[tokio::test]
    async fn malformed_body_is_rejected() {
        let app = TestApp::new();
        let response = app
            .post("/_callbacks/login/submit", None, json!({ "username": "a", "admin": true }))
            .await;
        assert!(response.status.is_client_error());
    }
}
