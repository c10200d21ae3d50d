use serde::{Deserialize, Serialize};

// -- Navigation --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NavigateRequest {
    pub pathname: String,
    #[serde(default)]
    pub logout_clicks: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct NavigateResponse {
    /// Where the browser should go next; `None` keeps the current page.
    pub redirect: Option<String>,
    pub menu: MenuState,
}

/// Navbar state: exactly one of the two dropdowns is visible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuState {
    pub auth_menu_visible: bool,
    pub user_menu_visible: bool,
    pub user_label: String,
}

// -- Login --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginFieldsRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ButtonState {
    pub disabled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertColor {
    Success,
    Danger,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub color: AlertColor,
    pub redirect: Option<String>,
}

// -- Registration --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterFieldsRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub confirm_password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterFieldsResponse {
    pub button_disabled: bool,
    pub username_alert: String,
    pub password_alert: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub redirect: Option<String>,
}

// -- Images --

/// One file picked in the browser. `content` is a data URL
/// (`data:<mime>;base64,<payload>`).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UploadedFile {
    pub filename: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UploadRequest {
    #[serde(default)]
    pub files: Vec<UploadedFile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadOutcome {
    Success,
    PartialSuccess,
    Empty,
    Error,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(rename = "type")]
    pub outcome: UploadOutcome,
    pub message: String,
    pub valid_files: Vec<String>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewOutcome {
    Success,
    Error,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewResponse {
    #[serde(rename = "type")]
    pub outcome: ReviewOutcome,
    pub message: String,
    pub errors: Vec<String>,
    pub redirect: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImageListResponse {
    pub filenames: Vec<String>,
    pub warning: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_response_uses_type_key() {
        let response = UploadResponse {
            outcome: UploadOutcome::PartialSuccess,
            message: "Upload completed".into(),
            valid_files: vec!["a.png".into()],
            errors: vec!["b.gif: Unsupported file type: b.gif".into()],
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["type"], "partial_success");
        assert_eq!(json["valid_files"][0], "a.png");
    }

    #[test]
    fn navigate_request_defaults_logout_clicks() {
        let req: NavigateRequest = serde_json::from_str(r#"{"pathname":"/login"}"#).unwrap();
        assert_eq!(req.pathname, "/login");
        assert_eq!(req.logout_clicks, None);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<LoginRequest, _> =
            serde_json::from_str(r#"{"username":"a","password":"b","remember":true}"#);
        assert!(result.is_err());
    }
}
