use thiserror::Error;
use tracing::error;

use crate::files::StorageError;

/// Failures of the authentication service.
///
/// These never escape a callback: handlers turn them into the message shown
/// next to the form via [`AuthError::user_message`].
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("username already exists")]
    DuplicateUser,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("{0}")]
    InvalidInput(String),

    #[error("no authenticated user")]
    Unauthenticated,

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

impl AuthError {
    pub fn user_message(&self) -> String {
        match self {
            Self::DuplicateUser => "Username already exists".into(),
            Self::InvalidCredentials => "Invalid username or password.".into(),
            Self::InvalidInput(message) => message.clone(),
            Self::Unauthenticated => "You must be logged in to upload images.".into(),
            Self::StorageUnavailable(_) => {
                "Storage is unavailable. Please try again later.".into()
            }
            Self::Internal(_) => GENERIC_FAILURE.into(),
        }
    }

    /// Like [`user_message`](Self::user_message), but logs the failures the
    /// user is not told the details of.
    pub fn surface(&self, action: &str) -> String {
        match self {
            Self::Internal(e) => error!("{} failed: {:#}", action, e),
            Self::StorageUnavailable(detail) => error!("{} failed: {}", action, detail),
            _ => {}
        }
        self.user_message()
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        Self::StorageUnavailable(err.to_string())
    }
}
