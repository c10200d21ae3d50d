//! Test doubles for the auth and storage seams.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use lightbox_types::models::{Identity, User};

use lightbox_db::Database;

use crate::auth::{AuthService, Authenticator};
use crate::error::AuthError;
use crate::files::{DiskFileStore, FileStore, StorageError};
use crate::session::{FileSessionStore, SessionContext, SessionSettings};

/// In-memory authenticator with plaintext passwords.
#[derive(Default)]
pub struct FakeAuthenticator {
    users: Mutex<HashMap<String, (User, String)>>,
    next_id: AtomicUsize,
    logouts: AtomicUsize,
}

impl FakeAuthenticator {
    pub fn with_user(username: &str, password: &str) -> Self {
        let fake = Self::default();
        fake.register(username, password).unwrap();
        fake
    }

    pub fn logout_count(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }
}

impl Authenticator for FakeAuthenticator {
    fn register(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let mut users = self.users.lock().unwrap();
        if users.contains_key(username) {
            return Err(AuthError::DuplicateUser);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as i64 + 1;
        let user = User {
            id,
            username: username.to_string(),
        };
        users.insert(username.to_string(), (user.clone(), password.to_string()));
        Ok(user)
    }

    fn authenticate(
        &self,
        session: &mut SessionContext,
        username: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let users = self.users.lock().unwrap();
        match users.get(username) {
            Some((user, stored)) if stored == password => {
                session.login(user.id);
                Ok(user.clone())
            }
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    fn current_identity(&self, session: &SessionContext) -> Identity {
        let Some(user_id) = session.user_id() else {
            return Identity::Anonymous;
        };
        self.users
            .lock()
            .unwrap()
            .values()
            .find(|(user, _)| user.id == user_id)
            .map(|(user, _)| Identity::User(user.clone()))
            .unwrap_or_default()
    }

    fn logout(&self, session: &mut SessionContext) {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        session.logout();
    }

    fn username_available(&self, username: &str) -> Result<bool, AuthError> {
        Ok(!self.users.lock().unwrap().contains_key(username))
    }
}

/// A file store whose disk is always broken.
pub struct FailingFileStore;

impl FailingFileStore {
    fn error() -> StorageError {
        StorageError::StorageUnavailable {
            path: PathBuf::from("/unavailable"),
            source: io::Error::other("disk offline"),
        }
    }
}

impl FileStore for FailingFileStore {
    fn ensure_user_folder(&self, _username: &str) -> Result<PathBuf, StorageError> {
        Err(Self::error())
    }

    fn list_user_files(&self, _username: &str) -> Result<Vec<String>, StorageError> {
        Err(Self::error())
    }

    fn save_file(&self, _username: &str, _filename: &str, _bytes: &[u8]) -> Result<String, StorageError> {
        Err(Self::error())
    }

    fn read_file(&self, _username: &str, _filename: &str) -> Result<Vec<u8>, StorageError> {
        Err(Self::error())
    }
}

/// A fully assembled router over temp-dir file and session stores.
pub struct TestApp<A = FakeAuthenticator> {
    pub router: axum::Router,
    pub auth: Arc<A>,
    pub files: Arc<DiskFileStore>,
    pub sessions_dir: PathBuf,
    _dir: tempfile::TempDir,
}

pub struct TestResponse {
    pub status: axum::http::StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    /// `name=value` of the session cookie set by this response, if any.
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(axum::http::header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with(crate::session::SESSION_COOKIE))
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
    }

    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(axum::http::header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_auth(FakeAuthenticator::default())
    }

    pub fn with_auth(auth: FakeAuthenticator) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let files = Arc::new(DiskFileStore::new(dir.path().join("users")).unwrap());
        Self::assemble(dir, Arc::new(auth), files)
    }
}

impl TestApp<AuthService> {
    /// The production auth service over a temp-dir SQLite database.
    pub fn with_real_auth() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(Database::open(&dir.path().join("users.db")).unwrap());
        let files = Arc::new(DiskFileStore::new(dir.path().join("users")).unwrap());
        let auth = Arc::new(AuthService::new(db, files.clone()));
        Self::assemble(dir, auth, files)
    }
}

impl<A: Authenticator + 'static> TestApp<A> {
    fn assemble(dir: tempfile::TempDir, auth: Arc<A>, files: Arc<DiskFileStore>) -> Self {
        let sessions_dir = dir.path().join("sessions");
        let sessions = FileSessionStore::open(sessions_dir.clone()).unwrap();
        let settings = SessionSettings::new(b"test-secret", chrono::Duration::hours(1), false).unwrap();
        let router = crate::build_app(auth.clone(), files.clone(), sessions, &settings).unwrap();
        Self {
            router,
            auth,
            files,
            sessions_dir,
            _dir: dir,
        }
    }

    /// Backdate every stored session so the next request finds it expired.
    pub fn expire_sessions(&self) {
        for entry in std::fs::read_dir(&self.sessions_dir).unwrap() {
            let path = entry.unwrap().path();
            let mut stored: serde_json::Value =
                serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
            stored["expires_at"] = serde_json::json!(0);
            std::fs::write(&path, stored.to_string()).unwrap();
        }
    }

    pub fn session_count(&self) -> usize {
        std::fs::read_dir(&self.sessions_dir).unwrap().count()
    }

    pub async fn send(&self, request: axum::http::Request<axum::body::Body>) -> TestResponse {
        use http_body_util::BodyExt;
        use tower::ServiceExt;

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
        TestResponse { status, headers, body }
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> TestResponse {
        let mut builder = axum::http::Request::builder().method("GET").uri(path);
        if let Some(cookie) = cookie {
            builder = builder.header(axum::http::header::COOKIE, cookie);
        }
        self.send(builder.body(axum::body::Body::empty()).unwrap()).await
    }

    pub async fn post(&self, path: &str, cookie: Option<&str>, body: serde_json::Value) -> TestResponse {
        let mut builder = axum::http::Request::builder()
            .method("POST")
            .uri(path)
            .header(axum::http::header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(axum::http::header::COOKIE, cookie);
        }
        self.send(builder.body(axum::body::Body::from(body.to_string())).unwrap()).await
    }

    /// Log in through the real callback and return the cookie to send back.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .post(
                "/_callbacks/login/submit",
                None,
                serde_json::json!({ "username": username, "password": password }),
            )
            .await;
        assert_eq!(response.status, axum::http::StatusCode::OK);
        response.session_cookie().expect("login sets a session cookie")
    }
}

/// A data URL wrapping a minimal PNG header.
pub fn png_data_url() -> String {
    use base64::Engine;
    let bytes = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}
