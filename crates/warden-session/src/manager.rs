//! Session lifecycle on top of a [`SessionRepo`].

use warden_core::{now_millis, Session};
use warden_store::{SessionRecord, SessionRepo};

use crate::carrier::{Carrier, Cookie};
use crate::codec::{SealedTokenCodec, TokenCodec};
use crate::config::SessionConfig;
use crate::error::Result;

/// Resolves, creates, saves and ends sessions.
///
/// The client holds only a sealed token naming the session; contents stay in
/// the repository.
pub struct SessionManager<S, C = SealedTokenCodec> {
    repo: S,
    codec: C,
    config: SessionConfig,
}

impl<S: SessionRepo, C: TokenCodec> SessionManager<S, C> {
    pub fn new(repo: S, codec: C, config: SessionConfig) -> Self {
        Self {
            repo,
            codec,
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn repo(&self) -> &S {
        &self.repo
    }

    /// The session named by the carrier's token, or a freshly started one
    /// when the token is missing, unreadable, expired or unknown.
    pub async fn get_session(&self, carrier: &impl Carrier) -> Result<Session> {
        match self.resume(carrier).await? {
            Some(session) => Ok(session),
            None => self.start_session().await,
        }
    }

    async fn resume(&self, carrier: &impl Carrier) -> Result<Option<Session>> {
        let Some(token) = carrier.read_token(&self.config.cookie_name) else {
            return Ok(None);
        };

        let claims = match self.codec.decode(&token) {
            Ok(claims) => claims,
            Err(err) => {
                tracing::debug!(%err, "discarding unreadable session token");
                return Ok(None);
            }
        };

        let now = now_millis();
        if claims.expires_at < now {
            tracing::debug!(session = %claims.session_id, "session token expired");
            return Ok(None);
        }

        let record = self.repo.load_session(&claims.session_id, now).await?;
        if record.is_none() {
            tracing::debug!(session = %claims.session_id, "no stored session for token");
        }
        Ok(record.map(SessionRecord::into_session))
    }

    /// Create and persist a new, empty session.
    pub async fn start_session(&self) -> Result<Session> {
        let session = Session::new(self.config.ttl());
        self.repo
            .insert_session(&SessionRecord::from_session(&session))
            .await?;

        tracing::debug!(session = %session.uuid(), "session started");
        Ok(session)
    }

    /// Extend the session's expiration, saving its contents when dirty.
    pub async fn update_session(&self, session: &Session) -> Result<()> {
        session.renew(self.config.ttl());
        let id = session.uuid();

        if session.store_dirty() {
            let contents = session.store();
            self.repo
                .update_session(&id, session.expires_at(), Some(&contents))
                .await?;
            session.mark_clean();
        } else {
            self.repo
                .update_session(&id, session.expires_at(), None)
                .await?;
        }

        Ok(())
    }

    /// Invalidate the client's token and delete the stored session.
    pub async fn end_session(&self, carrier: &mut impl Carrier, session: &Session) -> Result<()> {
        carrier.write_cookie(Cookie::invalidation(&self.config));

        let id = session.uuid();
        self.repo.delete_session(&id).await?;
        tracing::debug!(session = %id, "session ended");
        Ok(())
    }

    /// Hand the client a token for `session`.
    pub fn write_cookie(&self, carrier: &mut impl Carrier, session: &Session) -> Result<()> {
        let token = self.codec.encode(session)?;
        carrier.write_cookie(Cookie::session(&self.config, token, session.expires_at()));
        Ok(())
    }
}
