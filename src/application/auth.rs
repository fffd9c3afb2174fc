//! Editor authentication and session tracking.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,
}

/// Verifies editor credentials.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Principal, AuthError>;
}

#[derive(Debug, Clone)]
pub struct EditorCredential {
    pub username: String,
    pub password_sha256: Vec<u8>,
}

/// Editors declared in configuration, identified by SHA-256 password digests.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredEditors {
    editors: Vec<EditorCredential>,
}

impl ConfiguredEditors {
    pub fn new(editors: Vec<EditorCredential>) -> Self {
        Self { editors }
    }

    pub fn digest(password: &str) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(password.as_bytes());
        hasher.finalize().to_vec()
    }

    pub fn digest_hex(password: &str) -> String {
        hex::encode(Self::digest(password))
    }
}

#[async_trait]
impl Authenticator for ConfiguredEditors {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Principal, AuthError> {
        let supplied = Self::digest(password);
        // Every entry is compared so timing does not reveal which usernames exist.
        let mut matched = None;
        for editor in &self.editors {
            let digest_ok = editor.password_sha256.ct_eq(&supplied).unwrap_u8() == 1;
            if digest_ok && editor.username == username {
                matched = Some(editor.username.clone());
            }
        }

        matched
            .map(|username| Principal { username })
            .ok_or(AuthError::InvalidCredentials)
    }
}

struct Session {
    principal: Principal,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl Session {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}

/// In-process session table keyed by opaque random tokens.
pub struct SessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn open(&self, principal: Principal) -> String {
        let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, session| session.is_live(now));
        sessions.insert(
            token.clone(),
            Session {
                principal,
                expires_at: now.checked_add(self.ttl),
            },
        );
        token
    }

    pub async fn resolve(&self, token: &str) -> Option<Principal> {
        let now = Instant::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(token) {
                Some(session) if session.is_live(now) => {
                    return Some(session.principal.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        self.sessions.write().await.remove(token);
        None
    }

    pub async fn close(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }
}

#[derive(Clone)]
pub struct AuthService {
    authenticator: Arc<dyn Authenticator>,
    sessions: Arc<SessionStore>,
}

impl AuthService {
    pub fn new(authenticator: Arc<dyn Authenticator>, sessions: Arc<SessionStore>) -> Self {
        Self {
            authenticator,
            sessions,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.sessions.ttl()
    }

    /// Verifies the credentials and opens a session, returning its token.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(String, Principal), AuthError> {
        match self.authenticator.authenticate(username, password).await {
            Ok(principal) => {
                let token = self.sessions.open(principal.clone()).await;
                info!(
                    target = "goodnews::auth",
                    username = %principal.username,
                    "editor logged in"
                );
                Ok((token, principal))
            }
            Err(err) => {
                metrics::counter!("goodnews_login_failures_total").increment(1);
                warn!(
                    target = "goodnews::auth",
                    username = %username,
                    error = %err,
                    "login rejected"
                );
                Err(err)
            }
        }
    }

    pub async fn current(&self, token: &str) -> Option<Principal> {
        self.sessions.resolve(token).await
    }

    pub async fn logout(&self, token: &str) {
        self.sessions.close(token).await;
    }
}
