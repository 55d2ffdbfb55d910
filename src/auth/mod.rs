//! Authentication module: credential persistence and session lifecycle.
//!
//! This module provides:
//! - `bundle`: the persisted credential bundle (tokens, expirations, user
//!   profile) behind the `BundleStore` trait, with file, keychain, and
//!   in-memory backends
//! - `store`: the `SessionStore` owning in-memory session state, login/
//!   logout/restore, token refresh, and the background expiration watcher

pub mod bundle;
pub mod store;

pub use bundle::{Bundle, BundleStore, FileStore, KeyringStore, MemoryStore};
pub use store::{SessionStore, SessionState};
