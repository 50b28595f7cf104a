//! Server configuration types.
//!
//! The server reads `taskdeck.toml` (path overridable with `TASKDECK_CONFIG`)
//! and then applies environment overrides, so container deployments can run
//! without a file at all.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Canonical config file name.
pub const CONFIG_FILE_NAME: &str = "taskdeck.toml";

/// Env var naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "TASKDECK_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },
}

/// Top-level server configuration (persisted as `taskdeck.toml`).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: HttpSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub attendance: AttendanceSettings,
    #[serde(default)]
    pub invitations: InvitationSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HttpSettings {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Request body limit in bytes. Imports are the largest payloads.
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            base_url: default_base_url(),
            data_dir: default_data_dir(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthSettings {
    /// HS256 signing secret. Empty means "generate one per process".
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_password_iterations")]
    pub password_iterations: u32,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            password_iterations: default_password_iterations(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttendanceSettings {
    /// Interval of the background midnight sweep. `0` disables it.
    #[serde(default = "default_sweep_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for AttendanceSettings {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvitationSettings {
    #[serde(default = "default_invitation_ttl_days")]
    pub ttl_days: i64,
}

impl Default for InvitationSettings {
    fn default() -> Self {
        Self {
            ttl_days: default_invitation_ttl_days(),
        }
    }
}

fn default_port() -> u16 {
    3000
}
fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_body_limit() -> usize {
    8 * 1024 * 1024
}
fn default_password_iterations() -> u32 {
    600_000
}
fn default_sweep_secs() -> u64 {
    300
}
fn default_invitation_ttl_days() -> i64 {
    7
}

impl ServerConfig {
    pub fn from_toml_str(path: &Path, raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path` if it exists; a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_toml_str(path, &raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Apply environment overrides. `lookup` is `std::env::var(..).ok()` in
    /// production; tests pass a map.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = get("TASKDECK_DATA_DIR") {
            self.server.data_dir = PathBuf::from(dir);
        }
        if let Some(port) = get("PORT") {
            self.server.port = parse_env("PORT", &port)?;
        }
        if let Some(url) = get("BASE_URL") {
            self.server.base_url = url;
        }
        if let Some(secret) = get("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(iters) = get("TASKDECK_PASSWORD_ITERATIONS") {
            self.auth.password_iterations = parse_env("TASKDECK_PASSWORD_ITERATIONS", &iters)?;
        }
        if let Some(secs) = get("TASKDECK_ATTENDANCE_SWEEP_SECS") {
            self.attendance.sweep_interval_secs =
                parse_env("TASKDECK_ATTENDANCE_SWEEP_SECS", &secs)?;
        }
        if let Some(days) = get("TASKDECK_INVITATION_TTL_DAYS") {
            self.invitations.ttl_days = parse_env("TASKDECK_INVITATION_TTL_DAYS", &days)?;
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key,
        value: value.to_string(),
    })
}
