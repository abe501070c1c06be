//! Session gate: credential check, role facts and timed expiry.
//!
//! Passwords are hashed when the gate is built and compared in constant
//! time. Sessions live in memory only and expire a fixed time after login.

use std::{fmt, str::FromStr, time::Duration};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May manage the identifier list
    Admin,
    /// May run activations only
    #[default]
    Operator,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Operator => write!(f, "operator"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "operator" => Ok(Role::Operator),
            _ => Err(format!("Invalid role: {}. Valid roles: admin, operator", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Session expired, please log in again")]
    SessionExpired,

    #[error("Operation requires the {0} role")]
    Forbidden(Role),
}

/// A configured account. Only the password digest is kept.
#[derive(Clone)]
pub struct UserEntry {
    pub username: String,
    pub role: Role,
    password_hash: [u8; 32],
}

impl UserEntry {
    pub fn new(username: impl Into<String>, password: &str, role: Role) -> Self {
        Self {
            username: username.into(),
            role,
            password_hash: hash_password(password),
        }
    }

    fn verify(&self, password: &str) -> bool {
        self.password_hash.ct_eq(&hash_password(password)).into()
    }
}

impl fmt::Debug for UserEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserEntry")
            .field("username", &self.username)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// Parse `name:password:role`. The password may itself contain `:`.
impl FromStr for UserEntry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = s
            .split_once(':')
            .and_then(|(name, rest)| rest.rsplit_once(':').map(|(pw, role)| (name, pw, role)));
        let Some((name, password, role)) = parsed else {
            return Err("Invalid user entry: expected <name>:<password>:<role>".to_string());
        };
        if name.is_empty() || password.is_empty() {
            return Err("User name and password must not be empty".to_string());
        }
        Ok(UserEntry::new(name, password, role.parse()?))
    }
}

fn hash_password(password: &str) -> [u8; 32] {
    Sha256::digest(password.as_bytes()).into()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub username: String,
    pub role: Role,
    pub login_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct SessionGate {
    users: Vec<UserEntry>,
    sessions: DashMap<String, Session>,
    timeout: Duration,
}

impl SessionGate {
    pub fn new(users: Vec<UserEntry>, timeout: Duration) -> Self {
        Self {
            users,
            sessions: DashMap::new(),
            timeout,
        }
    }

    /// Check credentials and open a session. Returns the session token.
    pub fn login(&self, username: &str, password: &str) -> Result<(String, Session), AuthError> {
        let user = self
            .users
            .iter()
            .find(|u| u.username == username)
            .filter(|u| u.verify(password))
            .ok_or_else(|| {
                warn!("Failed login attempt for user '{}'", username);
                AuthError::InvalidCredentials
            })?;

        let token = Uuid::new_v4().to_string();
        let session = Session {
            username: user.username.clone(),
            role: user.role,
            login_at: Utc::now(),
        };
        self.sessions.insert(token.clone(), session.clone());
        info!("User '{}' logged in as {}", session.username, session.role);
        Ok((token, session))
    }

    pub fn logout(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Resolve a token to a live session, evicting it if expired
    pub fn validate(&self, token: &str) -> Result<Session, AuthError> {
        self.validate_at(token, Utc::now())
    }

    pub fn require_admin(&self, token: &str) -> Result<Session, AuthError> {
        let session = self.validate(token)?;
        if !session.role.is_admin() {
            return Err(AuthError::Forbidden(Role::Admin));
        }
        Ok(session)
    }

    /// Drop every expired session; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now())
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Session, AuthError> {
        let session = self
            .sessions
            .get(token)
            .map(|s| s.value().clone())
            .ok_or(AuthError::Unauthenticated)?;
        if self.is_expired(&session, now) {
            self.sessions.remove(token);
            info!("Session for '{}' expired", session.username);
            return Err(AuthError::SessionExpired);
        }
        Ok(session)
    }

    // counted inside retain: logins may insert while the sweep runs
    fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut purged = 0;
        self.sessions.retain(|_, s| {
            let expired = self.is_expired(s, now);
            if expired {
                purged += 1;
            }
            !expired
        });
        purged
    }

    fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        let age = now
            .signed_duration_since(session.login_at)
            .to_std()
            .unwrap_or_default();
        age >= self.timeout
    }
}
