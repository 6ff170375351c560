//! Ban lists for player names and addresses.
//!
//! Persists data as JSON files in the configured data directory.

use std::collections::HashMap;
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A ban entry with a reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BanEntry {
    pub reason: String,
}

/// Banned names and IPs with JSON persistence.
pub struct BanManager {
    dir: PathBuf,
    /// Banned players: name → ban entry.
    pub banned_players: HashMap<String, BanEntry>,
    /// Banned IPs: IP string → ban entry.
    pub banned_ips: HashMap<String, BanEntry>,
}

const BANNED_PLAYERS_FILE: &str = "banned-players.json";
const BANNED_IPS_FILE: &str = "banned-ips.json";

impl BanManager {
    /// Load both ban lists from `dir`. Missing files give empty lists.
    pub fn load(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            banned_players: load_map(&dir.join(BANNED_PLAYERS_FILE)),
            banned_ips: load_map(&dir.join(BANNED_IPS_FILE)),
        }
    }

    /// Ban reason for `name` or `ip`, the name ban taking precedence.
    pub fn is_banned(&self, name: &str, ip: IpAddr) -> Option<&str> {
        self.banned_players
            .get(name)
            .or_else(|| self.banned_ips.get(&ip.to_string()))
            .map(|entry| entry.reason.as_str())
    }

    pub fn ban_player(&mut self, name: &str, reason: &str) {
        self.banned_players.insert(
            name.to_string(),
            BanEntry {
                reason: reason.to_string(),
            },
        );
        save_map(&self.dir.join(BANNED_PLAYERS_FILE), &self.banned_players);
    }

    pub fn ban_ip(&mut self, ip: IpAddr, reason: &str) {
        self.banned_ips.insert(
            ip.to_string(),
            BanEntry {
                reason: reason.to_string(),
            },
        );
        save_map(&self.dir.join(BANNED_IPS_FILE), &self.banned_ips);
    }

    pub fn unban_player(&mut self, name: &str) -> bool {
        let removed = self.banned_players.remove(name).is_some();
        if removed {
            save_map(&self.dir.join(BANNED_PLAYERS_FILE), &self.banned_players);
        }
        removed
    }
}

/// Load a HashMap<String, BanEntry> from a JSON object file.
fn load_map(path: &Path) -> HashMap<String, BanEntry> {
    if !path.exists() {
        return HashMap::new();
    }
    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<HashMap<String, BanEntry>>(&contents) {
            Ok(map) => {
                info!("Loaded {} entries from {}", map.len(), path.display());
                map
            }
            Err(e) => {
                warn!("Failed to parse {}: {e}", path.display());
                HashMap::new()
            }
        },
        Err(e) => {
            warn!("Failed to read {}: {e}", path.display());
            HashMap::new()
        }
    }
}

/// Save a HashMap<String, BanEntry> as a JSON object.
fn save_map(path: &Path, map: &HashMap<String, BanEntry>) {
    match serde_json::to_string_pretty(map) {
        Ok(json) => {
            if let Err(e) = fs::write(path, json) {
                warn!("Failed to write {}: {e}", path.display());
            }
        }
        Err(e) => warn!("Failed to serialize {}: {e}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    /// Run a test in its own temporary directory.
    fn in_temp_dir<F: FnOnce(&Path)>(tag: &str, f: F) {
        let tmp = env::temp_dir().join(format!("mt_rs_ban_{tag}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&tmp);
        let _ = fs::create_dir_all(&tmp);
        f(&tmp);
        let _ = fs::remove_dir_all(tmp);
    }

    #[test]
    fn load_empty_creates_defaults() {
        in_temp_dir("empty", |dir| {
            let bans = BanManager::load(dir);
            assert!(bans.banned_players.is_empty());
            assert!(bans.banned_ips.is_empty());
        });
    }

    #[test]
    fn save_and_reload_bans() {
        in_temp_dir("reload", |dir| {
            let mut bans = BanManager::load(dir);
            bans.ban_player("Hacker", "Cheating");
            bans.ban_ip("10.0.0.1".parse().unwrap(), "Spam");

            let bans = BanManager::load(dir);
            assert_eq!(bans.banned_players["Hacker"].reason, "Cheating");
            assert_eq!(bans.banned_ips["10.0.0.1"].reason, "Spam");
        });
    }

    #[test]
    fn is_banned_checks_name_then_ip() {
        in_temp_dir("lookup", |dir| {
            let mut bans = BanManager::load(dir);
            let ip: IpAddr = "10.0.0.1".parse().unwrap();
            let other: IpAddr = "10.0.0.2".parse().unwrap();
            assert_eq!(bans.is_banned("alice", ip), None);
            bans.ban_ip(ip, "Spam");
            assert_eq!(bans.is_banned("alice", ip), Some("Spam"));
            assert_eq!(bans.is_banned("alice", other), None);
            bans.ban_player("alice", "Griefing");
            assert_eq!(bans.is_banned("alice", other), Some("Griefing"));
            assert!(bans.unban_player("alice"));
            assert_eq!(bans.is_banned("alice", other), None);
        });
    }
}
