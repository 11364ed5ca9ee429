//! The assembled service: one store shared by authorization, authentication
//! and sessions.

use std::sync::Arc;

use warden_authz::Authorizer;
use warden_core::{Permission, Session};
use warden_session::{SealedTokenCodec, SessionManager};
use warden_store::{AuthRepo, SessionRepo, SqliteStore, UserAuthRepo};

use crate::authenticator::Authenticator;
use crate::config::WardenConfig;
use crate::error::{AuthError, Result};

/// Authorizer, authenticator and session manager sharing one store.
pub struct Warden<S> {
    store: Arc<S>,
    authorizer: Arc<Authorizer<Arc<S>>>,
    authenticator: Authenticator<Arc<S>>,
    sessions: SessionManager<Arc<S>>,
    config: WardenConfig,
}

impl<S> Warden<S>
where
    S: AuthRepo + UserAuthRepo + SessionRepo,
{
    /// Load the authorization cache from `store` and wire up the rest.
    pub async fn open(store: S, config: WardenConfig) -> Result<Self> {
        let store = Arc::new(store);
        let authorizer = Arc::new(Authorizer::new(Arc::clone(&store)).await?);

        let codec = match &config.token_secret {
            Some(secret) => {
                SealedTokenCodec::new(secret.as_bytes(), config.session.cookie_name.clone())
            }
            None => {
                tracing::warn!("no token secret configured; sessions will not survive a restart");
                SealedTokenCodec::generate(config.session.cookie_name.clone())
            }
        };

        Ok(Self {
            authenticator: Authenticator::new(Arc::clone(&store)),
            sessions: SessionManager::new(Arc::clone(&store), codec, config.session.clone()),
            authorizer,
            store,
            config,
        })
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The shared authorization cache.
    pub fn authorizer(&self) -> &Arc<Authorizer<Arc<S>>> {
        &self.authorizer
    }

    pub fn authenticator(&self) -> &Authenticator<Arc<S>> {
        &self.authenticator
    }

    pub fn sessions(&self) -> &SessionManager<Arc<S>> {
        &self.sessions
    }

    pub fn config(&self) -> &WardenConfig {
        &self.config
    }

    /// Whether the user bound to `session` holds `permission` through their
    /// role. Anonymous sessions are denied.
    pub async fn authorize_session(&self, session: &Session, permission: &Permission) -> Result<bool> {
        let user = match self.authenticator.is_authenticated_session(session).await {
            Ok(user) => user,
            Err(AuthError::SessionNotAuthenticated) => return Ok(false),
            Err(err) => return Err(err.into()),
        };

        Ok(self.authorizer.granted(&user, permission).await)
    }
}

impl Warden<SqliteStore> {
    /// Open the configured database, or an in-memory one when no path is set.
    pub async fn open_sqlite(config: WardenConfig) -> Result<Self> {
        let store = match &config.database_path {
            Some(path) => SqliteStore::open(path)?,
            None => SqliteStore::open_memory()?,
        };
        Self::open(store, config).await
    }
}
