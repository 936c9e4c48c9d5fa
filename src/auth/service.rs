use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use time::Duration;
use tracing::{info, warn};

use crate::auth::dto::{PublicUser, RegisterRequest};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo::{NewUser, UserStore};
use crate::auth::session::{Session, SessionStore};
use crate::error::Error;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Emails are matched case-insensitively: one account per address, however
/// it is capitalized.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Orchestrates registration, login, logout, identity lookup and account
/// deletion over the injected stores. Holds no per-request state; every
/// operation goes through the user and session repositories.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    session_ttl: Duration,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            users,
            sessions,
            session_ttl,
        }
    }

    /// Create an account and log it in. Returns the public user view and the
    /// freshly issued session.
    pub async fn register(&self, payload: RegisterRequest) -> Result<(PublicUser, Session), Error> {
        let email = normalize_email(&payload.email);
        if !is_valid_email(&email) {
            warn!(email = %email, "register rejected: invalid email");
            return Err(Error::Validation("Invalid email".into()));
        }
        if payload.password.is_empty() {
            return Err(Error::Validation("Password is required".into()));
        }
        let first_name = payload.first_name.trim();
        if first_name.is_empty() {
            return Err(Error::Validation("First name is required".into()));
        }

        // Friendly pre-check; the unique index on the store is the
        // authoritative guard against a racing duplicate.
        if self.users.find_by_email(&email).await?.is_some() {
            warn!(email = %email, "register rejected: email already registered");
            return Err(Error::Conflict);
        }

        let password_hash = hash_password(&payload.password)?;
        let user = self
            .users
            .create(NewUser {
                email,
                password_hash,
                first_name: first_name.to_string(),
                last_name: payload
                    .last_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            })
            .await?;

        let session = self.sessions.issue(user.id, self.session_ttl).await?;
        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok((user.into(), session))
    }

    /// Verify credentials and issue a new session. Prior sessions for the
    /// same user stay valid; each login is independently destroyable.
    pub async fn login(&self, email: &str, password: &str) -> Result<(PublicUser, Session), Error> {
        let email = normalize_email(email);

        // Unknown email and wrong password must be indistinguishable to the
        // caller, so both paths produce the identical error.
        let Some(user) = self.users.find_by_email(&email).await? else {
            warn!(email = %email, "login rejected: unknown email");
            return Err(Error::invalid_credentials());
        };
        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "login rejected: wrong password");
            return Err(Error::invalid_credentials());
        }

        let session = self.sessions.issue(user.id, self.session_ttl).await?;
        info!(user_id = %user.id, email = %user.email, "user logged in");
        Ok((user.into(), session))
    }

    /// Destroy the session if it exists. Logging out an absent or already
    /// expired session is not an error.
    pub async fn logout(&self, token: &str) -> Result<(), Error> {
        self.sessions.destroy(token).await
    }

    /// Resolve a token to its session, for the request gate. Expired and
    /// unknown tokens both come back as None.
    pub async fn resolve_session(&self, token: &str) -> Result<Option<Session>, Error> {
        self.sessions.resolve(token).await
    }

    /// Resolve the token and fetch the identity behind it. A session whose
    /// user is gone is destroyed on detection and reported as NotFound.
    pub async fn current_user(&self, token: &str) -> Result<PublicUser, Error> {
        let session = self
            .sessions
            .resolve(token)
            .await?
            .ok_or(Error::Unauthenticated)?;

        match self.users.find_by_id(session.user_id).await? {
            Some(user) => Ok(user.into()),
            None => {
                warn!(user_id = %session.user_id, "dangling session: user gone, invalidating");
                self.sessions.destroy(token).await?;
                Err(Error::NotFound)
            }
        }
    }

    /// Delete the account behind the session. The password re-check is the
    /// re-authentication boundary: a stolen cookie alone cannot destroy an
    /// account. All sessions of the user are invalidated, not just this one.
    pub async fn delete_account(&self, token: &str, password: Option<&str>) -> Result<(), Error> {
        let session = self
            .sessions
            .resolve(token)
            .await?
            .ok_or(Error::Unauthenticated)?;

        let password = match password {
            Some(p) if !p.is_empty() => p,
            _ => return Err(Error::Validation("Password is required".into())),
        };

        let Some(user) = self.users.find_by_id(session.user_id).await? else {
            self.sessions.destroy(token).await?;
            return Err(Error::NotFound);
        };
        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "delete rejected: wrong password");
            return Err(Error::invalid_password());
        }

        self.users.delete(user.id).await?;
        self.sessions.destroy_all_for_user(user.id).await?;
        info!(user_id = %user.id, "account deleted");
        Ok(())
    }
}
