use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use tracing::{info, warn};

use lightbox_db::Database;
use lightbox_types::models::{Identity, User};

use crate::error::AuthError;
use crate::files::FileStore;
use crate::session::SessionContext;

const MAX_USERNAME_LEN: usize = 80;

/// The authentication boundary callbacks are written against.
///
/// Handlers only ever see `Arc<dyn Authenticator>`, so tests can swap in a
/// double without touching them. [`AuthService`] is the production
/// implementation.
pub trait Authenticator: Send + Sync {
    fn register(&self, username: &str, password: &str) -> Result<User, AuthError>;

    /// Check credentials and bind a new session to the user on success.
    fn authenticate(
        &self,
        session: &mut SessionContext,
        username: &str,
        password: &str,
    ) -> Result<User, AuthError>;

    fn current_identity(&self, session: &SessionContext) -> Identity;

    fn logout(&self, session: &mut SessionContext);

    fn username_available(&self, username: &str) -> Result<bool, AuthError>;
}

pub struct AuthService {
    db: Arc<Database>,
    files: Arc<dyn FileStore>,
}

impl AuthService {
    pub fn new(db: Arc<Database>, files: Arc<dyn FileStore>) -> Self {
        Self { db, files }
    }
}

impl Authenticator for AuthService {
    fn register(&self, username: &str, password: &str) -> Result<User, AuthError> {
        validate_username(username)?;
        if password.is_empty() {
            return Err(AuthError::InvalidInput("Password empty".into()));
        }

        if self.db.get_user_by_username(username)?.is_some() {
            return Err(AuthError::DuplicateUser);
        }

        // Hash password with Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let hashed_password = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Hashing failed: {}", e))?
            .to_string();

        // The UNIQUE constraint catches a registration that raced the check above.
        let id = self
            .db
            .create_user(username, &hashed_password)?
            .ok_or(AuthError::DuplicateUser)?;

        info!("Registered user {} (id {})", username, id);
        Ok(User {
            id,
            username: username.to_string(),
        })
    }

    fn authenticate(
        &self,
        session: &mut SessionContext,
        username: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let Some(row) = self.db.get_user_by_username(username)? else {
            warn!("Login rejected: unknown user {}", username);
            return Err(AuthError::InvalidCredentials);
        };

        let parsed_hash = PasswordHash::new(&row.hashed_password)
            .map_err(|e| anyhow::anyhow!("Stored hash for {} is unreadable: {}", username, e))?;

        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_err()
        {
            warn!("Login rejected: wrong password for {}", username);
            return Err(AuthError::InvalidCredentials);
        }

        // No session until the user has somewhere to upload to.
        self.files.ensure_user_folder(&row.username)?;
        session.login(row.id);

        info!("User {} logged in", row.username);
        Ok(row.into())
    }

    fn current_identity(&self, session: &SessionContext) -> Identity {
        let Some(user_id) = session.user_id() else {
            return Identity::Anonymous;
        };

        match self.db.get_user_by_id(user_id) {
            Ok(Some(row)) => Identity::User(row.into()),
            Ok(None) => Identity::Anonymous,
            Err(e) => {
                warn!("Treating request as anonymous, session lookup failed: {:#}", e);
                Identity::Anonymous
            }
        }
    }

    fn logout(&self, session: &mut SessionContext) {
        if let Some(user_id) = session.user_id() {
            info!("User {} logged out", user_id);
        }
        session.logout();
    }

    fn username_available(&self, username: &str) -> Result<bool, AuthError> {
        Ok(self.db.get_user_by_username(username)?.is_none())
    }
}

/// Usernames double as folder names, so keep them to a portable alphabet.
fn validate_username(username: &str) -> Result<(), AuthError> {
    if username.is_empty() {
        return Err(AuthError::InvalidInput("Username empty".into()));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(AuthError::InvalidInput(format!(
            "Username must be at most {} characters",
            MAX_USERNAME_LEN
        )));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.');
    if !username.chars().all(allowed) || username.chars().all(|c| c == '.') {
        return Err(AuthError::InvalidInput(
            "Username may only contain letters, digits, '-', '_' and '.'".into(),
        ));
    }
    Ok(())
}
