//! Session token encoding.
//!
//! A token carries only the session id and its expiry; everything else lives
//! in the session repository. [`SealedTokenCodec`] encodes those claims as
//! CBOR, seals them with ChaCha20-Poly1305 and hex-encodes
//! `nonce || ciphertext` so the result is safe in a cookie value.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warden_core::Session;

use crate::error::{Result, SessionError};

/// Domain separation context for token keys.
const KEY_CONTEXT: &str = "warden-session-token-v1";

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// What a decoded token says about its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenClaims {
    pub session_id: Uuid,
    /// Expiration (Unix ms) at the time the token was issued.
    pub expires_at: i64,
}

/// Turns sessions into opaque client tokens and back.
pub trait TokenCodec: Send + Sync {
    fn encode(&self, session: &Session) -> Result<String>;

    fn decode(&self, token: &str) -> Result<TokenClaims>;
}

#[derive(Serialize, Deserialize)]
struct WireClaims {
    #[serde(rename = "sid", default, skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
    #[serde(rename = "exp")]
    expires_at: i64,
}

/// Authenticated-encryption token codec.
///
/// Tokens are bound to the cookie name they were issued under.
#[derive(Clone)]
pub struct SealedTokenCodec {
    key: [u8; 32],
    name: String,
}

impl SealedTokenCodec {
    /// Derive the sealing key from an application secret.
    pub fn new(secret: &[u8], cookie_name: impl Into<String>) -> Self {
        Self {
            key: blake3::derive_key(KEY_CONTEXT, secret),
            name: cookie_name.into(),
        }
    }

    /// Use a random key. Tokens do not survive a restart.
    pub fn generate(cookie_name: impl Into<String>) -> Self {
        let mut key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key);
        Self {
            key,
            name: cookie_name.into(),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.name
    }

    fn cipher(&self) -> Result<ChaCha20Poly1305> {
        ChaCha20Poly1305::new_from_slice(&self.key).map_err(|e| SessionError::Encoding(e.to_string()))
    }

    fn seal(&self, claims: &WireClaims) -> Result<String> {
        let mut plaintext = Vec::new();
        ciborium::into_writer(claims, &mut plaintext)
            .map_err(|e| SessionError::Encoding(e.to_string()))?;

        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher()?
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: &plaintext,
                    aad: self.name.as_bytes(),
                },
            )
            .map_err(|e| SessionError::Encoding(e.to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(hex::encode(sealed))
    }

    fn open(&self, token: &str) -> Result<WireClaims> {
        let sealed = hex::decode(token).map_err(|e| SessionError::Token(e.to_string()))?;
        if sealed.len() < NONCE_LEN + TAG_LEN {
            return Err(SessionError::Token(format!(
                "token too short: {} bytes",
                sealed.len()
            )));
        }

        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let plaintext = self
            .cipher()?
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: self.name.as_bytes(),
                },
            )
            .map_err(|_| SessionError::Token("authentication failed".into()))?;

        ciborium::from_reader(plaintext.as_slice()).map_err(|e| SessionError::Token(e.to_string()))
    }
}

impl TokenCodec for SealedTokenCodec {
    fn encode(&self, session: &Session) -> Result<String> {
        self.seal(&WireClaims {
            session_id: Some(session.session_id()),
            expires_at: session.expires_at(),
        })
    }

    fn decode(&self, token: &str) -> Result<TokenClaims> {
        let claims = self.open(token)?;

        let raw = claims.session_id.ok_or(SessionError::NoSessionId)?;
        let session_id =
            Uuid::parse_str(&raw).map_err(|_| SessionError::InvalidSessionId(raw.clone()))?;

        Ok(TokenClaims {
            session_id,
            expires_at: claims.expires_at,
        })
    }
}

impl std::fmt::Debug for SealedTokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SealedTokenCodec")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
