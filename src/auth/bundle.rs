//! Persisted credential bundle: tokens, expirations, and the user profile.
//!
//! The bundle is a flat string key/value store with exactly five well-known
//! keys. Any key may be absent - a partial bundle is a valid "not
//! authenticated" or legacy state, and expiry checks fail closed when the
//! expiration keys are missing.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};

/// Bundle file name in the storage directory (used by `FileStore`)
const BUNDLE_FILE: &str = "credentials.json";

// Persisted key names. These match the backend's localStorage-era layout and
// must not change without a migration.
pub const ACCESS_TOKEN: &str = "accessToken";
pub const REFRESH_TOKEN: &str = "refreshToken";
pub const USER: &str = "user";
pub const ACCESS_EXPIRATION: &str = "accessExpiration";
pub const REFRESH_EXPIRATION: &str = "refreshExpiration";

/// All persisted keys, in the order they are cleared on logout.
pub const BUNDLE_KEYS: [&str; 5] = [
    ACCESS_TOKEN,
    REFRESH_TOKEN,
    USER,
    ACCESS_EXPIRATION,
    REFRESH_EXPIRATION,
];

/// Parse a stored expiration timestamp.
///
/// Accepts RFC 3339 / ISO-8601 strings or integer epoch seconds; anything
/// else parses to `None` and is therefore treated as already expired.
pub fn parse_expiration(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(secs) = raw.trim().parse::<i64>() {
        return Utc.timestamp_opt(secs, 0).single();
    }
    None
}

/// Expiry predicate. An absent timestamp is always expired (fail closed);
/// the expiration instant itself counts as expired.
pub fn is_expired(expiration: Option<DateTime<Utc>>) -> bool {
    match expiration {
        Some(t) => Utc::now() >= t,
        None => true,
    }
}

/// Durable string key/value storage for the credential bundle.
///
/// Implementations are synchronous: the navigation guard and UI layers read
/// session state on their hot path and must never suspend for it.
pub trait BundleStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

// ============================================================================
// Stores
// ============================================================================

/// In-process store for tests and embedders that manage persistence themselves.
#[derive(Default)]
pub struct MemoryStore {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BundleStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.map.lock().unwrap_or_else(|e| e.into_inner()).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.map
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.map.lock().unwrap_or_else(|e| e.into_inner()).remove(key);
        Ok(())
    }
}

/// File-backed store: one JSON object at `dir/credentials.json`.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            path: dir.join(BUNDLE_FILE),
        }
    }

    fn read_map(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .context("Failed to read credential bundle file")?;
        serde_json::from_str(&contents).context("Failed to parse credential bundle file")
    }

    fn write_map(&self, map: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(map)?;
        std::fs::write(&self.path, contents).context("Failed to write credential bundle file")
    }
}

impl BundleStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_map()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

/// OS keychain store: one keyring entry per bundle key.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, key).context("Failed to create keyring entry")
    }
}

impl BundleStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read credential from keychain"),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .context("Failed to store credential in keychain")
    }

    fn remove(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete credential from keychain"),
        }
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Point-in-time snapshot of the persisted bundle.
#[derive(Debug, Clone, Default)]
pub struct Bundle {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<String>,
    pub access_expiration: Option<String>,
    pub refresh_expiration: Option<String>,
}

impl Bundle {
    /// Read every key from the store.
    pub fn load(store: &dyn BundleStore) -> Result<Self> {
        Ok(Self {
            access_token: store.get(ACCESS_TOKEN)?,
            refresh_token: store.get(REFRESH_TOKEN)?,
            user: store.get(USER)?,
            access_expiration: store.get(ACCESS_EXPIRATION)?,
            refresh_expiration: store.get(REFRESH_EXPIRATION)?,
        })
    }

    /// A restorable session needs at least the user, the access token, and
    /// its expiration. Anything less stays unauthenticated.
    pub fn is_restorable(&self) -> bool {
        self.user.is_some() && self.access_token.is_some() && self.access_expiration.is_some()
    }

    pub fn access_expired(&self) -> bool {
        is_expired(self.access_expiration.as_deref().and_then(parse_expiration))
    }

    pub fn refresh_expired(&self) -> bool {
        is_expired(self.refresh_expiration.as_deref().and_then(parse_expiration))
    }

    /// Parse the stored user profile. A corrupt profile is treated as absent.
    pub fn user_profile(&self) -> Option<serde_json::Value> {
        self.user.as_deref().and_then(|raw| serde_json::from_str(raw).ok())
    }
}
