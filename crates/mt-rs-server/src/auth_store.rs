//! Account records: encoded password, privileges and last login.
//!
//! Persisted as one JSON object (`auth.json`) keyed by player name.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub const AUTH_FILE: &str = "auth.json";

/// Every privilege the server knows about; the admin gets all of them.
pub const KNOWN_PRIVILEGES: &[&str] = &[
    "interact",
    "shout",
    "fast",
    "fly",
    "noclip",
    "teleport",
    "bring",
    "give",
    "settime",
    "privs",
    "basic_privs",
    "password",
    "server",
    "ban",
    "kick",
    "rollback",
    "protection_bypass",
];

#[derive(Debug, Error)]
pub enum AuthStoreError {
    #[error("auth store io: {0}")]
    Io(#[from] std::io::Error),
    #[error("auth store json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthEntry {
    /// `#1#salt#verifier` or a legacy base64 hash.
    pub password: String,
    pub privileges: BTreeSet<String>,
    /// Unix seconds; 0 = never.
    #[serde(default)]
    pub last_login: u64,
}

pub struct AuthStore {
    path: Option<PathBuf>,
    entries: BTreeMap<String, AuthEntry>,
    default_privs: Vec<String>,
    admin: String,
}

impl AuthStore {
    /// In-memory store, never written to disk.
    pub fn in_memory(default_privs: Vec<String>, admin: &str) -> Self {
        Self {
            path: None,
            entries: BTreeMap::new(),
            default_privs,
            admin: admin.to_string(),
        }
    }

    /// Load `path`; a missing file gives an empty store.
    pub fn load(
        path: &Path,
        default_privs: Vec<String>,
        admin: &str,
    ) -> Result<Self, AuthStoreError> {
        let entries = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let entries: BTreeMap<String, AuthEntry> = serde_json::from_str(&contents)?;
            info!("Loaded {} auth entries from {}", entries.len(), path.display());
            entries
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path: Some(path.to_path_buf()),
            entries,
            default_privs,
            admin: admin.to_string(),
        })
    }

    pub fn get(&self, name: &str) -> Option<&AuthEntry> {
        self.entries.get(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Create `name` unless it already exists. Returns false when it did.
    pub fn create_auth(&mut self, name: &str, password: &str) -> bool {
        if self.entries.contains_key(name) {
            return false;
        }
        let privileges = if !self.admin.is_empty() && name == self.admin {
            KNOWN_PRIVILEGES.iter().map(|p| p.to_string()).collect()
        } else {
            self.default_privs.iter().cloned().collect()
        };
        self.entries.insert(
            name.to_string(),
            AuthEntry {
                password: password.to_string(),
                privileges,
                last_login: 0,
            },
        );
        info!("Created auth entry for {name}");
        self.save_logged();
        true
    }

    pub fn set_password(&mut self, name: &str, password: &str) -> bool {
        match self.entries.get_mut(name) {
            Some(entry) => {
                entry.password = password.to_string();
                self.save_logged();
                true
            }
            None => false,
        }
    }

    pub fn record_login(&mut self, name: &str) {
        if let Some(entry) = self.entries.get_mut(name) {
            entry.last_login = unix_timestamp();
            self.save_logged();
        }
    }

    pub fn privileges(&self, name: &str) -> BTreeSet<String> {
        self.entries
            .get(name)
            .map(|e| e.privileges.clone())
            .unwrap_or_default()
    }

    pub fn grant(&mut self, name: &str, privilege: &str) -> bool {
        match self.entries.get_mut(name) {
            Some(entry) => {
                entry.privileges.insert(privilege.to_string());
                self.save_logged();
                true
            }
            None => false,
        }
    }

    pub fn save(&self) -> Result<(), AuthStoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    fn save_logged(&self) {
        if let Err(e) = self.save() {
            warn!("Failed to save auth store: {e}");
        }
    }
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mt_rs_auth_{tag}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn privs() -> Vec<String> {
        vec!["interact".into(), "shout".into()]
    }

    #[test]
    fn create_is_create_if_absent() {
        let mut store = AuthStore::in_memory(privs(), "");
        assert!(store.create_auth("alice", "#1#a#b"));
        assert!(!store.create_auth("alice", "#1#c#d"));
        assert_eq!(store.get("alice").unwrap().password, "#1#a#b");
    }

    #[test]
    fn new_accounts_get_default_privs() {
        let mut store = AuthStore::in_memory(privs(), "boss");
        store.create_auth("alice", "x");
        store.create_auth("boss", "y");
        let alice = store.privileges("alice");
        assert!(alice.contains("interact"));
        assert!(!alice.contains("server"));
        assert_eq!(store.privileges("boss").len(), KNOWN_PRIVILEGES.len());
    }

    #[test]
    fn set_password_requires_account() {
        let mut store = AuthStore::in_memory(privs(), "");
        assert!(!store.set_password("ghost", "x"));
        store.create_auth("alice", "x");
        assert!(store.set_password("alice", "y"));
        assert_eq!(store.get("alice").unwrap().password, "y");
    }

    #[test]
    fn save_and_reload() {
        let dir = temp_dir("reload");
        let path = dir.join(AUTH_FILE);
        {
            let mut store = AuthStore::load(&path, privs(), "").unwrap();
            store.create_auth("alice", "#1#salt#verifier");
            store.grant("alice", "fast");
            store.record_login("alice");
        }
        let store = AuthStore::load(&path, privs(), "").unwrap();
        let entry = store.get("alice").unwrap();
        assert_eq!(entry.password, "#1#salt#verifier");
        assert!(entry.privileges.contains("fast"));
        assert!(entry.last_login > 0);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = temp_dir("corrupt");
        let path = dir.join(AUTH_FILE);
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            AuthStore::load(&path, privs(), ""),
            Err(AuthStoreError::Json(_))
        ));
        let _ = std::fs::remove_dir_all(dir);
    }
}
