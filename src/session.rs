use base64::Engine;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{AdapterError, Result};
use crate::model::credential::Credential;
use crate::upstream::transport::Transport;
use crate::upstream::{ClientHandle, UpstreamSettings};

pub const INVALID_TOKEN: &str = "invalid or expired token";

struct Session {
    handle: Arc<ClientHandle>,
    created_at: Instant,
}

/// Maps session tokens to authenticated client handles.
///
/// Entries live until logout, or until the optional TTL elapses. Nothing is
/// persisted across restarts.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    settings: UpstreamSettings,
    transport: Arc<dyn Transport>,
    ttl: Option<Duration>,
    shutdown: CancellationToken,
}

impl SessionStore {
    pub fn new(settings: UpstreamSettings, transport: Arc<dyn Transport>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            settings,
            transport,
            ttl: None,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Validates the credential upstream and opens a session for it.
    ///
    /// The store is left untouched when validation fails. The returned handle is
    /// the one stored under the token.
    pub async fn login(
        &self,
        organization: &str,
        project: &str,
        pat: &str,
    ) -> Result<(String, Arc<ClientHandle>)> {
        let credential = Credential::new(organization, project, pat);
        let handle = ClientHandle::new(
            credential,
            &self.settings,
            self.transport.clone(),
            self.shutdown.child_token(),
        );
        handle.validate().await?;

        let handle = Arc::new(handle);
        let token = mint_token(organization, project);
        self.lock().insert(
            token.clone(),
            Session {
                handle: handle.clone(),
                created_at: Instant::now(),
            },
        );
        info!(organization, project, "session opened");
        Ok((token, handle))
    }

    pub fn resolve(&self, token: &str) -> Result<Arc<ClientHandle>> {
        let mut sessions = self.lock();
        let expired = match sessions.get(token) {
            Some(session) => self
                .ttl
                .is_some_and(|ttl| session.created_at.elapsed() >= ttl),
            None => return Err(AdapterError::auth(INVALID_TOKEN)),
        };

        if expired {
            if let Some(session) = sessions.remove(token) {
                session.handle.cancel();
                info!(organization = session.handle.organization(), "session expired");
            }
            return Err(AdapterError::auth(INVALID_TOKEN));
        }

        sessions
            .get(token)
            .map(|session| session.handle.clone())
            .ok_or_else(|| AdapterError::auth(INVALID_TOKEN))
    }

    /// Closes the session for `token`. Unknown tokens are ignored.
    pub fn logout(&self, token: &str) {
        if let Some(session) = self.lock().remove(token) {
            session.handle.cancel();
            info!(organization = session.handle.organization(), "session closed");
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cancels in-flight calls of every session and drops them all.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Opaque token built from the organization, project, creation time and a random suffix.
fn mint_token(organization: &str, project: &str) -> String {
    let raw = format!(
        "{organization}:{project}:{}:{}",
        chrono::Utc::now().timestamp_millis(),
        uuid::Uuid::new_v4().simple()
    );
    base64::engine::general_purpose::STANDARD.encode(raw)
}
