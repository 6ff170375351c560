use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub timeouts: TimeoutsSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub rollback: RollbackSection,
}

#[derive(Debug, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Admin name: bypasses the user limit and gets every privilege.
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_max_users")]
    pub max_users: usize,
    #[serde(default)]
    pub singleplayer: bool,
    #[serde(default)]
    pub default_password: String,
    #[serde(default)]
    pub disallow_empty_password: bool,
    #[serde(default)]
    pub strict_protocol_version_checking: bool,
    #[serde(default)]
    pub enable_mod_channels: bool,
    #[serde(default)]
    pub disable_anticheat: bool,
    #[serde(default = "default_true")]
    pub enable_damage: bool,
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    #[serde(default)]
    pub map_seed: u64,
    /// Spawn point, in nodes.
    #[serde(default = "default_spawn")]
    pub spawn: [f32; 3],
    #[serde(default = "default_privs")]
    pub default_privs: Vec<String>,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_address() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    30000
}

fn default_max_users() -> usize {
    15
}

fn default_true() -> bool {
    true
}

fn default_worker_threads() -> usize {
    4
}

fn default_spawn() -> [f32; 3] {
    [0.0, 20.0, 0.0]
}

fn default_privs() -> Vec<String> {
    vec!["interact".into(), "shout".into()]
}

fn default_data_dir() -> String {
    ".".into()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            name: String::new(),
            max_users: default_max_users(),
            singleplayer: false,
            default_password: String::new(),
            disallow_empty_password: false,
            strict_protocol_version_checking: false,
            enable_mod_channels: false,
            disable_anticheat: false,
            enable_damage: true,
            worker_threads: default_worker_threads(),
            map_seed: 0,
            spawn: default_spawn(),
            default_privs: default_privs(),
            data_dir: default_data_dir(),
        }
    }
}

impl ServerSection {
    /// Anti-cheat checks run unless disabled or in singleplayer.
    pub fn anticheat_enabled(&self) -> bool {
        !self.disable_anticheat && !self.singleplayer
    }

    pub fn data_path(&self, file: &str) -> PathBuf {
        Path::new(&self.data_dir).join(file)
    }
}

#[derive(Debug, Deserialize)]
pub struct TimeoutsSection {
    #[serde(default = "default_peer_timeout")]
    pub peer_timeout_secs: u64,
    /// How long a connection may sit before sending INIT.
    #[serde(default = "default_linger_timeout")]
    pub linger_timeout_secs: u64,
    /// Maximum time for a login or sudo handshake.
    #[serde(default = "default_auth_timeout")]
    pub auth_timeout_secs: u64,
    #[serde(default = "default_step_interval")]
    pub step_interval_ms: u64,
}

fn default_peer_timeout() -> u64 {
    30
}

fn default_linger_timeout() -> u64 {
    10
}

fn default_auth_timeout() -> u64 {
    60
}

fn default_step_interval() -> u64 {
    100
}

impl Default for TimeoutsSection {
    fn default() -> Self {
        Self {
            peer_timeout_secs: default_peer_timeout(),
            linger_timeout_secs: default_linger_timeout(),
            auth_timeout_secs: default_auth_timeout(),
            step_interval_ms: default_step_interval(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RollbackSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Entries kept in memory.
    #[serde(default = "default_rollback_capacity")]
    pub capacity: usize,
}

fn default_rollback_capacity() -> usize {
    10_000
}

impl Default for RollbackSection {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: default_rollback_capacity(),
        }
    }
}

impl ServerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }
}
