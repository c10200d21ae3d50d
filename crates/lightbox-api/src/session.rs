//! Login sessions.
//!
//! Cookie handling, id rotation and expiry come from `tower-sessions`. This
//! module supplies the store it persists into, one JSON file per session
//! under the session directory, and [`SessionContext`], the plain value the
//! auth service reads and mutates inside a handler.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use time::OffsetDateTime;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tower_sessions::cookie::{Key, SameSite};
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store::{self, SessionStore};
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, Session, SessionManagerLayer};
use tracing::{debug, info, warn};

pub const SESSION_COOKIE: &str = "lightbox_session";

/// Ten years. Keeps every expiry date representable.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365 * 10;

const USER_ID_KEY: &str = "user_id";

/// What a handler did to the caller's login during this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChange {
    Login(i64),
    Logout,
}

/// Per-request view of the caller's session.
///
/// Handlers [`load`](Self::load) one from the request's [`Session`], hand it
/// to the auth service, and [`apply`](Self::apply) it afterwards so a login
/// or logout reaches the store and the response cookie.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    user_id: Option<i64>,
    change: Option<SessionChange>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            change: None,
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user_id
    }

    pub fn change(&self) -> Option<SessionChange> {
        self.change
    }

    pub fn is_changed(&self) -> bool {
        self.change.is_some()
    }

    /// Bind the session to `user_id`. Whatever it held before is discarded.
    pub fn login(&mut self, user_id: i64) {
        self.user_id = Some(user_id);
        self.change = Some(SessionChange::Login(user_id));
    }

    /// Drop the binding. No-op on an anonymous context.
    pub fn logout(&mut self) {
        if self.user_id.take().is_some() {
            self.change = Some(SessionChange::Logout);
        }
    }

    /// Read the caller's binding. An unreadable session counts as anonymous.
    pub async fn load(session: &Session) -> Self {
        match session.get::<i64>(USER_ID_KEY).await {
            Ok(Some(user_id)) => Self::for_user(user_id),
            Ok(None) => Self::anonymous(),
            Err(e) => {
                warn!("Treating request as anonymous, session load failed: {}", e);
                Self::anonymous()
            }
        }
    }

    /// Write a login or logout back to `session`.
    pub async fn apply(&self, session: &Session) -> Result<(), tower_sessions::session::Error> {
        match self.change {
            None => Ok(()),
            Some(SessionChange::Login(user_id)) => {
                // New id on every login; the old record is deleted.
                session.cycle_id().await?;
                session.insert(USER_ID_KEY, user_id).await?;
                debug!("Session started for user {}", user_id);
                Ok(())
            }
            Some(SessionChange::Logout) => session.flush().await,
        }
    }
}

/// Session records as JSON files `{dir}/{id}.json`.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

#[derive(Serialize, Deserialize)]
struct StoredSession {
    data: HashMap<String, serde_json::Value>,
    /// Unix seconds.
    expires_at: i64,
}

impl FileSessionStore {
    pub fn open(dir: PathBuf) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating session directory {}", dir.display()))?;
        info!("Session directory: {}", dir.display());
        Ok(Self { dir })
    }

    fn path(&self, id: &Id) -> PathBuf {
        // `Id` renders as base64url, so it is always a plain file name.
        self.dir.join(format!("{}.json", id))
    }

    fn encode(record: &Record) -> session_store::Result<Vec<u8>> {
        let stored = StoredSession {
            data: record.data.clone(),
            expires_at: record.expiry_date.unix_timestamp(),
        };
        serde_json::to_vec(&stored).map_err(|e| session_store::Error::Encode(e.to_string()))
    }

    async fn remove(&self, path: &Path) -> session_store::Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(backend(path, e)),
        }
    }

    /// Remove every session file whose expiry has passed. Returns how many
    /// were removed.
    pub async fn delete_expired(&self) -> session_store::Result<usize> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let mut entries = fs::read_dir(&self.dir).await.map_err(|e| backend(&self.dir, e))?;
        let mut removed = 0;

        while let Some(entry) = entries.next_entry().await.map_err(|e| backend(&self.dir, e))? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let expired = match fs::read(&path).await {
                Ok(raw) => serde_json::from_slice::<StoredSession>(&raw)
                    .map(|stored| stored.expires_at <= now)
                    .unwrap_or(true),
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(backend(&path, e)),
            };
            if expired {
                self.remove(&path).await?;
                removed += 1;
            }
        }

        if removed > 0 {
            debug!("Removed {} expired sessions", removed);
        }
        Ok(removed)
    }
}

fn backend(path: &Path, err: io::Error) -> session_store::Error {
    session_store::Error::Backend(format!("{}: {}", path.display(), err))
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        let raw = Self::encode(record)?;
        loop {
            let path = self.path(&record.id);
            let opened = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;
            match opened {
                Ok(mut file) => {
                    file.write_all(&raw).await.map_err(|e| backend(&path, e))?;
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => record.id = Id::default(),
                Err(e) => return Err(backend(&path, e)),
            }
        }
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        let path = self.path(&record.id);
        let raw = Self::encode(record)?;
        fs::write(&path, raw).await.map_err(|e| backend(&path, e))
    }

    async fn load(&self, id: &Id) -> session_store::Result<Option<Record>> {
        let path = self.path(id);
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(backend(&path, e)),
        };
        let stored: StoredSession =
            serde_json::from_slice(&raw).map_err(|e| session_store::Error::Decode(e.to_string()))?;

        let expiry_date = OffsetDateTime::from_unix_timestamp(stored.expires_at)
            .map_err(|e| session_store::Error::Decode(e.to_string()))?;
        if expiry_date <= OffsetDateTime::now_utc() {
            debug!("Session {} expired", id);
            self.remove(&path).await?;
            return Ok(None);
        }

        Ok(Some(Record {
            id: *id,
            data: stored.data,
            expiry_date,
        }))
    }

    async fn delete(&self, id: &Id) -> session_store::Result<()> {
        self.remove(&self.path(id)).await
    }
}

/// Cookie and lifetime settings for the session layer.
#[derive(Clone)]
pub struct SessionSettings {
    key: Key,
    ttl: time::Duration,
    secure: bool,
}

impl SessionSettings {
    /// `secret` is stretched to a 64-byte signing key, so any length works.
    pub fn new(secret: &[u8], ttl: chrono::Duration, secure: bool) -> anyhow::Result<Self> {
        let max = chrono::Duration::hours(MAX_SESSION_TTL_HOURS);
        if ttl < chrono::Duration::seconds(1) || ttl > max {
            bail!("session lifetime must be between 1 second and {} hours", MAX_SESSION_TTL_HOURS);
        }

        let digest = Sha512::digest(secret);
        Ok(Self {
            key: Key::from(digest.as_slice()),
            ttl: time::Duration::seconds(ttl.num_seconds()),
            secure,
        })
    }

    /// Signed session cookie over `store`, expiring `ttl` after the last login.
    pub fn layer(&self, store: FileSessionStore) -> SessionManagerLayer<FileSessionStore, SignedCookie> {
        SessionManagerLayer::new(store)
            .with_name(SESSION_COOKIE)
            .with_path("/")
            .with_http_only(true)
            .with_same_site(SameSite::Lax)
            .with_secure(self.secure)
            .with_expiry(Expiry::OnInactivity(self.ttl))
            .with_signed(self.key.clone())
    }
}
