use hackhero_db::{Database, StoreError};
use hackhero_types::models::{Role, Session};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::credentials::{Argon2Verifier, CredentialVerifier};

const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=32;
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// Username or email already registered.
    #[error("account already exists")]
    AccountExists,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AccountError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConstraintViolation(_) => Self::AccountExists,
            StoreError::InvalidInput(msg) => Self::InvalidInput(msg),
            other => Self::Store(other),
        }
    }
}

/// Registration and sign-in on top of a store handle.
pub struct Accounts<V = Argon2Verifier> {
    verifier: V,
}

impl Default for Accounts<Argon2Verifier> {
    fn default() -> Self {
        Self::new(Argon2Verifier::default())
    }
}

impl<V: CredentialVerifier> Accounts<V> {
    pub fn new(verifier: V) -> Self {
        Self { verifier }
    }

    /// Self-service sign-up. New accounts are always players.
    pub fn register_player(
        &self,
        db: &Database,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Uuid, AccountError> {
        self.register(db, Role::Player, username, email, password)
    }

    /// Operator provisioning of an admin account.
    pub fn register_admin(
        &self,
        db: &Database,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Uuid, AccountError> {
        self.register(db, Role::Admin, username, email, password)
    }

    fn register(
        &self,
        db: &Database,
        role: Role,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Uuid, AccountError> {
        let username = username.trim();
        let email = email.trim();
        if !USERNAME_LEN.contains(&username.len()) {
            return Err(AccountError::InvalidInput("username must be 3 to 32 characters"));
        }
        if !email.contains('@') {
            return Err(AccountError::InvalidInput("email address is malformed"));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AccountError::InvalidInput("password must be at least 8 characters"));
        }

        if db.get_user_by_username(username)?.is_some() {
            return Err(AccountError::AccountExists);
        }

        let hash = self.verifier.hash(password)?;
        let id = db.next_id();
        match role {
            Role::Player => db.register_player(id, username, email, &hash)?,
            Role::Admin => db.register_admin(id, username, email, &hash)?,
        }

        info!("Account '{}' created as {:?}", username, role);
        Ok(id)
    }

    /// Check a username/password pair and report who signed in.
    /// Unknown users and wrong passwords are indistinguishable to the caller.
    pub fn authenticate(
        &self,
        db: &Database,
        username: &str,
        password: &str,
    ) -> Result<Session, AccountError> {
        let Some(user) = db.get_user_by_username(username.trim())? else {
            return Err(AccountError::InvalidCredentials);
        };
        let hash = db
            .credential_hash(user.id)?
            .ok_or(AccountError::InvalidCredentials)?;

        if !self.verifier.verify(password, &hash)? {
            warn!("Failed sign-in for '{}'", user.username);
            return Err(AccountError::InvalidCredentials);
        }

        Ok(Session {
            is_admin: db.is_admin(user.id)?,
            user_id: user.id,
            username: user.username,
        })
    }
}
