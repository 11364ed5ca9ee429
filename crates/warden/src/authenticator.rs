//! Credential verification and session identity binding.

use warden_core::{Credentials, Session, User, USER_ID_SESSION_KEY};
use warden_store::UserAuthRepo;

use crate::error::AuthError;
use crate::password::{Argon2Hasher, PasswordHasher};

type Result<T> = std::result::Result<T, AuthError>;

/// Logs users in and resolves sessions to users.
pub struct Authenticator<R, H = Argon2Hasher> {
    repo: R,
    hasher: H,
}

impl<R: UserAuthRepo> Authenticator<R> {
    /// Authenticate with Argon2id under its default parameters.
    pub fn new(repo: R) -> Self {
        Self::with_hasher(repo, Argon2Hasher::default())
    }
}

impl<R: UserAuthRepo, H: PasswordHasher> Authenticator<R, H> {
    pub fn with_hasher(repo: R, hasher: H) -> Self {
        Self { repo, hasher }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Hash a plaintext password for storage.
    pub fn encrypt_password(&self, plaintext: &str) -> Result<String> {
        self.hasher.hash(plaintext)
    }

    /// The user named by `credentials`, if the password matches.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<User> {
        let user = self
            .repo
            .get_user_by_credentials(credentials)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !self.hasher.verify(&credentials.password, &user.password_hash) {
            tracing::debug!(user = user.id, "password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }

    /// The user bound to `session`.
    pub async fn is_authenticated_session(&self, session: &Session) -> Result<User> {
        Ok(self.repo.get_user_from_session(session).await?)
    }

    /// Authenticate and bind the user to `session`.
    ///
    /// The session becomes dirty; the caller persists it as usual.
    pub async fn login(&self, session: &Session, credentials: &Credentials) -> Result<User> {
        let user = self.authenticate(credentials).await?;
        session.set(USER_ID_SESSION_KEY, user.id);

        tracing::debug!(user = user.id, session = %session.uuid(), "user logged in");
        Ok(user)
    }

    /// Remove any user binding from `session`.
    pub fn logout(&self, session: &Session) {
        session.delete(USER_ID_SESSION_KEY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use warden_core::{Role, RoleRef};
    use warden_store::{AuthRepo, MemoryStore};

    async fn setup() -> (Authenticator<MemoryStore>, User) {
        let store = MemoryStore::new();
        store.create_role(&Role::new("2", "blogger")).await.unwrap();

        let auth = Authenticator::with_hasher(store, Argon2Hasher::with_params(1024, 1, 1).unwrap());
        let hash = auth.encrypt_password("hunter2").unwrap();
        let user = auth
            .repo()
            .create_user(&User::new("ada@example.com", hash, RoleRef::new("2", "")))
            .await
            .unwrap();
        (auth, user)
    }

    #[tokio::test]
    async fn test_authenticate() {
        let (auth, user) = setup().await;

        let found = auth
            .authenticate(&Credentials::new("ada@example.com", "hunter2"))
            .await
            .unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.role.name, "blogger");
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_look_alike() {
        let (auth, _) = setup().await;

        let wrong = auth
            .authenticate(&Credentials::new("ada@example.com", "nope"))
            .await
            .unwrap_err();
        let unknown = auth
            .authenticate(&Credentials::new("bob@example.com", "hunter2"))
            .await
            .unwrap_err();

        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert!(matches!(unknown, AuthError::UserNotFound));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn test_login_binds_and_logout_unbinds() {
        let (auth, user) = setup().await;
        let session = Session::new(Duration::from_secs(60));

        assert!(matches!(
            auth.is_authenticated_session(&session).await,
            Err(AuthError::SessionNotAuthenticated)
        ));

        auth.login(&session, &Credentials::new("ada@example.com", "hunter2"))
            .await
            .unwrap();
        assert!(session.store_dirty());
        assert_eq!(auth.is_authenticated_session(&session).await.unwrap(), user);

        auth.logout(&session);
        assert!(matches!(
            auth.is_authenticated_session(&session).await,
            Err(AuthError::SessionNotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_failed_login_leaves_session_untouched() {
        let (auth, _) = setup().await;
        let session = Session::new(Duration::from_secs(60));

        assert!(auth
            .login(&session, &Credentials::new("ada@example.com", "wrong"))
            .await
            .is_err());
        assert!(!session.store_dirty());
        assert!(session.get(USER_ID_SESSION_KEY).is_none());
    }
}
