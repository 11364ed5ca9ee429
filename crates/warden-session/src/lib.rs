//! # Warden Session
//!
//! Session lifecycle: resolving a client's token to a stored session,
//! starting new sessions, saving dirty contents and ending sessions.
//!
//! ## Key Types
//!
//! - [`SessionManager`] - Get, start, update and end sessions
//! - [`TokenCodec`] / [`SealedTokenCodec`] - Opaque, tamper-evident client tokens
//! - [`Carrier`] - Where tokens are read from and cookies written to
//! - [`SessionConfig`] - Lifetime and cookie settings
//!
//! ## Token format
//!
//! ```text
//! hex( nonce[12] || ChaCha20-Poly1305( CBOR { sid, exp }, aad = cookie name ) )
//! ```
//!
//! The sealing key is derived from an application secret with
//! `blake3::derive_key`.

pub mod carrier;
pub mod codec;
pub mod config;
pub mod error;
pub mod manager;

pub use carrier::{Carrier, Cookie};
pub use codec::{SealedTokenCodec, TokenClaims, TokenCodec};
pub use config::SessionConfig;
pub use error::{Result, SessionError};
pub use manager::SessionManager;
