//! Authenticated session and the user's collections
//!
//! [`SessionStore`] owns the active session. It follows the auth provider's
//! state stream once [`SessionStore::start`] is called, loads the user's
//! document on sign-in and writes every collection change back to the
//! document store without blocking on the write.
pub mod identity_toolkit;

pub use identity_toolkit::IdentityToolkitAuth;

use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::db::{create_redis_client, DocumentStore, RedisDocumentStore};
use crate::error::{AppError, AppResult};
use crate::models::{
    AuthState, Credentials, DocumentField, ExternalCredential, Movie, MovieReview, Review,
    Session, User, UserDocument,
};

/// Authentication collaborator
///
/// Implementations publish every sign-in and sign-out, including ones that
/// happen without a call from this process (token expiry), on the stream
/// returned by [`AuthProvider::subscribe`].
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, credentials: &Credentials) -> AppResult<User>;

    async fn sign_up(&self, credentials: &Credentials, display_name: &str) -> AppResult<User>;

    async fn sign_in_with_external_provider(
        &self,
        credential: &ExternalCredential,
    ) -> AppResult<User>;

    async fn sign_out(&self) -> AppResult<()>;

    fn subscribe(&self) -> watch::Receiver<AuthState>;

    /// Returns the name of this provider for logging
    fn name(&self) -> &'static str;
}

#[derive(Debug, Default)]
struct SessionState {
    session: Option<Session>,
    /// Bumped on every activation and sign-out; a document load that finishes
    /// under a different generation is stale
    generation: u64,
}

/// Handle for the auth state subscription started by [`SessionStore::start`]
pub struct SessionSubscription {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl SessionSubscription {
    /// Stops following the auth provider and waits for the listener to exit
    pub async fn unsubscribe(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Session listener task failed");
        }
        tracing::info!("Session listener stopped");
    }
}

#[derive(Clone)]
pub struct SessionStore {
    auth: Arc<dyn AuthProvider>,
    documents: Arc<dyn DocumentStore>,
    state: Arc<RwLock<SessionState>>,
    /// Held across a document load and across every snapshot-and-write pair:
    /// no field is written before the load lands, and writes land in order
    writes: Arc<Mutex<()>>,
}

impl SessionStore {
    pub fn new(auth: Arc<dyn AuthProvider>, documents: Arc<dyn DocumentStore>) -> Self {
        Self {
            auth,
            documents,
            state: Arc::new(RwLock::new(SessionState::default())),
            writes: Arc::new(Mutex::new(())),
        }
    }

    /// Identity Toolkit sign-in over Redis-backed documents
    ///
    /// Returns `None` when no Identity Toolkit key is configured.
    pub fn from_config(config: &Config) -> anyhow::Result<Option<Self>> {
        let Some(api_key) = config.identity_api_key.clone() else {
            return Ok(None);
        };

        let auth = IdentityToolkitAuth::new(api_key, config.identity_api_url.clone());
        let documents = RedisDocumentStore::new(create_redis_client(&config.redis_url)?);
        Ok(Some(Self::new(Arc::new(auth), Arc::new(documents))))
    }

    /// Follows the auth provider's state stream until unsubscribed
    ///
    /// The current state is applied first, so a provider that is already
    /// signed in activates the session right away.
    pub fn start(&self) -> SessionSubscription {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let mut auth_rx = self.auth.subscribe();
        let store = self.clone();

        let task = tokio::spawn(async move {
            tracing::info!(provider = store.auth.name(), "Session listener started");
            let initial = auth_rx.borrow_and_update().clone();
            store.on_auth_state(initial).await;

            loop {
                tokio::select! {
                    changed = auth_rx.changed() => {
                        if changed.is_err() {
                            tracing::warn!("Auth state stream closed");
                            break;
                        }
                        let state = auth_rx.borrow_and_update().clone();
                        store.on_auth_state(state).await;
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        SessionSubscription { shutdown_tx, task }
    }

    async fn on_auth_state(&self, state: AuthState) {
        match state {
            AuthState::SignedIn(user) => {
                self.activate(user).await;
            }
            AuthState::SignedOut => self.clear().await,
        }
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> AppResult<Session> {
        let user = self.auth.sign_in(credentials).await?;
        Ok(self.activate(user).await)
    }

    pub async fn sign_up(
        &self,
        credentials: &Credentials,
        display_name: &str,
    ) -> AppResult<Session> {
        let user = self.auth.sign_up(credentials, display_name).await?;
        Ok(self.activate(user).await)
    }

    pub async fn sign_in_with_external_provider(
        &self,
        credential: &ExternalCredential,
    ) -> AppResult<Session> {
        let user = self.auth.sign_in_with_external_provider(credential).await?;
        Ok(self.activate(user).await)
    }

    /// Clears the session at once; the remote sign-out is best-effort
    pub async fn sign_out(&self) {
        self.clear().await;
        if let Err(e) = self.auth.sign_out().await {
            tracing::warn!(error = %e, "Remote sign-out failed");
        }
    }

    pub async fn current(&self) -> Option<Session> {
        self.state.read().await.session.clone()
    }

    pub async fn is_signed_in(&self) -> bool {
        self.state.read().await.session.is_some()
    }

    /// Starts a session for `user` and loads their document
    ///
    /// Activating the user that is already active is a no-op, so a sign-in
    /// call and the matching auth state event only load once.
    async fn activate(&self, user: User) -> Session {
        let _writes = self.writes.lock().await;
        let generation = {
            let mut state = self.state.write().await;
            if let Some(session) = &state.session {
                if session.user.id == user.id {
                    return session.clone();
                }
            }
            state.generation += 1;
            state.session = Some(Session {
                user: user.clone(),
                watch_list: Vec::new(),
                watch_later: Vec::new(),
                reviews: Vec::new(),
            });
            state.generation
        };

        let document = match self.documents.load(&user.id).await {
            Ok(document) => document.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(uid = %user.id, error = %e, "Failed to load user document");
                UserDocument::default()
            }
        };

        let mut state = self.state.write().await;
        if state.generation != generation {
            tracing::debug!(uid = %user.id, "Discarding stale document load");
        } else if let Some(session) = state.session.as_mut() {
            session.watch_list = document.watch_list;
            session.watch_later = document.watch_later;
            session.reviews = document.reviews;
        }

        tracing::info!(
            uid = %user.id,
            watch_list = state.session.as_ref().map_or(0, |s| s.watch_list.len()),
            "Session started"
        );
        state.session.clone().unwrap_or_else(|| Session {
            user,
            watch_list: Vec::new(),
            watch_later: Vec::new(),
            reviews: Vec::new(),
        })
    }

    async fn clear(&self) {
        let mut state = self.state.write().await;
        state.generation += 1;
        if let Some(session) = state.session.take() {
            tracing::info!(uid = %session.user.id, "Session cleared");
        }
    }

    /// Adds `movie` to the watch list
    ///
    /// Returns `false` when it is already there. The local list changes
    /// first; a failed remote write is logged and not rolled back.
    pub async fn add_to_watch_list(&self, movie: Movie) -> AppResult<bool> {
        self.update(|session| {
            if session.watch_list.iter().any(|m| m.id == movie.id) {
                return None;
            }
            session.watch_list.push(movie);
            Some(DocumentField::WatchList(session.watch_list.clone()))
        })
        .await
    }

    /// Adds `movie` to the watch-later list; same policy as the watch list
    pub async fn add_to_watch_later(&self, movie: Movie) -> AppResult<bool> {
        self.update(|session| {
            if session.watch_later.iter().any(|m| m.id == movie.id) {
                return None;
            }
            session.watch_later.push(movie);
            Some(DocumentField::WatchLater(session.watch_later.clone()))
        })
        .await
    }

    /// Records a review, replacing an earlier review of the same movie
    pub async fn record_review(&self, movie: &Movie, review: &Review) -> AppResult<()> {
        let entry = MovieReview::new(movie, review);
        self.update(|session| {
            session.reviews.retain(|r| r.movie_id != entry.movie_id);
            session.reviews.push(entry);
            Some(DocumentField::Reviews(session.reviews.clone()))
        })
        .await?;
        Ok(())
    }

    /// Applies `change` to the active session and persists the field it returns
    ///
    /// Waits for an in-flight document load, so the snapshot written always
    /// includes the stored entries.
    async fn update<F>(&self, change: F) -> AppResult<bool>
    where
        F: FnOnce(&mut Session) -> Option<DocumentField>,
    {
        let _writes = self.writes.lock().await;
        let (uid, field) = {
            let mut state = self.state.write().await;
            let session = state
                .session
                .as_mut()
                .ok_or_else(|| AppError::Auth("Not signed in".to_string()))?;
            match change(session) {
                Some(field) => (session.user.id.clone(), field),
                None => return Ok(false),
            }
        };

        if let Err(e) = self.documents.merge(&uid, &field).await {
            tracing::error!(
                uid = %uid,
                field = field.name(),
                store = self.documents.name(),
                error = %e,
                "Failed to persist user document"
            );
        }
        Ok(true)
    }
}
