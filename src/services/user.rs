//! User service
//!
//! Registration, login/logout and session lookup. Sessions are rows in the
//! `sessions` table keyed by a random UUID that the browser holds in the
//! `session` cookie.

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{Session, User, UserRole};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

const DEFAULT_SESSION_LIFETIME_DAYS: i64 = 7;
const EMAIL_MAX_LEN: usize = 180;
const PASSWORD_MIN_LEN: usize = 6;
const PASSWORD_MAX_LEN: usize = 4096;
const INVALID_CREDENTIALS: &str = "Invalid credentials.";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Unknown email or wrong password; deliberately not more specific
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("User not found")]
    NotFound,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_lifetime_days: i64,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>, session_repo: Arc<dyn SessionRepository>) -> Self {
        Self::with_session_lifetime(user_repo, session_repo, DEFAULT_SESSION_LIFETIME_DAYS)
    }

    pub fn with_session_lifetime(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_lifetime_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_lifetime_days,
        }
    }

    /// Register a new account with `ROLE_USER`.
    ///
    /// # Errors
    ///
    /// - `ValidationError` for a malformed email or a password outside 6..=4096 chars
    /// - `UserExists` if the email is taken
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        let email = validate_email(&input.email)?;
        validate_password(&input.password)?;

        if self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(
                "There is already an account with this email".to_string(),
            ));
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let user = User::new(email, password_hash, vec![UserRole::User]);

        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;

        tracing::info!(user_id = created.id, "registered new user");
        Ok(created)
    }

    /// Check credentials and open a session
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationError` with the same message for an unknown
    /// email and for a wrong password.
    pub async fn login(&self, input: LoginInput) -> Result<Session, UserServiceError> {
        let user = self
            .user_repo
            .get_by_email(input.email.trim())
            .await
            .context("Failed to get user by email")?
            .ok_or_else(|| UserServiceError::AuthenticationError(INVALID_CREDENTIALS.to_string()))?;

        let valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;
        if !valid {
            return Err(UserServiceError::AuthenticationError(
                INVALID_CREDENTIALS.to_string(),
            ));
        }

        self.start_session(user.id).await
    }

    /// Open a session for a user that is already authenticated (e.g. just registered)
    pub async fn start_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let session = Session::start(user_id, self.session_lifetime_days);
        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        Ok(created)
    }

    /// Drop a session. Unknown tokens are not an error.
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;

        Ok(())
    }

    /// Resolve a session token to its user.
    ///
    /// Returns `None` for unknown tokens and for expired sessions, which
    /// are deleted on the way.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!(user_id = session.user_id, "Failed to delete expired session: {}", e);
            }
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;

        Ok(user)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?;

        Ok(user)
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_email(email)
            .await
            .context("Failed to get user by email")?;

        Ok(user)
    }

    /// Make sure an administrator account with this email exists.
    ///
    /// A missing account is created with the given password; an existing one
    /// keeps its password and gains `ROLE_ADMIN` if it lacks it.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if `email` is malformed, or if a new
    /// account's password is outside 6..=4096 chars.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<User, UserServiceError> {
        let email = validate_email(email)?;

        if let Some(mut user) = self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to look up admin")?
        {
            if !user.is_admin() {
                user.roles.push(UserRole::Admin);
                user.roles = user.roles();
                self.user_repo
                    .update_roles(user.id, &user.roles)
                    .await
                    .context("Failed to grant admin role")?;
                tracing::info!(user_id = user.id, "granted ROLE_ADMIN to configured admin");
            }
            return Ok(user);
        }

        validate_password(password)?;
        let password_hash = hash_password(password).context("Failed to hash password")?;
        let user = User::new(email, password_hash, vec![UserRole::User, UserRole::Admin]);
        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create admin")?;

        tracing::info!(user_id = created.id, "created configured admin account");
        Ok(created)
    }

    /// Delete every expired session; returns how many went
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired(Utc::now())
            .await
            .context("Failed to delete expired sessions")?;

        Ok(count)
    }
}

fn validate_email(email: &str) -> Result<String, UserServiceError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(UserServiceError::ValidationError(
            "Please enter an email.".to_string(),
        ));
    }
    if email.chars().count() > EMAIL_MAX_LEN {
        return Err(UserServiceError::ValidationError(format!(
            "Email is too long. It should have {} characters or less.",
            EMAIL_MAX_LEN
        )));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(UserServiceError::ValidationError(
            "This value is not a valid email address.".to_string(),
        ));
    }
    Ok(email.to_string())
}

fn validate_password(password: &str) -> Result<(), UserServiceError> {
    let len = password.chars().count();
    if len == 0 {
        return Err(UserServiceError::ValidationError(
            "Please enter a password.".to_string(),
        ));
    }
    if len < PASSWORD_MIN_LEN {
        return Err(UserServiceError::ValidationError(format!(
            "Your password should be at least {} characters.",
            PASSWORD_MIN_LEN
        )));
    }
    if len > PASSWORD_MAX_LEN {
        return Err(UserServiceError::ValidationError(format!(
            "Your password should be at most {} characters.",
            PASSWORD_MAX_LEN
        )));
    }
    Ok(())
}

/// Input for user registration
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
}

impl RegisterInput {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Input for user login
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
