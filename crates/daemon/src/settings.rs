//! Daemon settings
//!
//! Layers, lowest first: built-in defaults, the TOML file named by
//! `KISSAN_CONFIG` (default `kissan.toml`, optional), then `KISSAN_*`
//! environment variables with `__` between sections (`KISSAN_RPC__PORT=9600`).

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use kissan_api_rpc::RpcServerConfig;
use kissan_core::application::{AuthConfig, BootstrapAdmin};
use kissan_core::port::MaintenanceConfig;
use kissan_infra_mail::SmtpConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_VAR: &str = "KISSAN_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "kissan.toml";
const DEFAULT_DB_PATH: &str = "~/.kissan/kissan.db";

#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    pub database: DatabaseSettings,
    pub rpc: RpcSettings,
    pub rate_limit: RateLimitSettings,
    pub login: LoginSettings,
    pub session: SessionSettings,
    pub maintenance: MaintenanceSettings,
    pub log: LogSettings,
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
    #[serde(default)]
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    pub burst: u32,
    pub per_second: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginSettings {
    pub max_attempts: u32,
    pub window_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaintenanceSettings {
    pub interval_hours: u64,
    pub max_db_size_mb: f64,
    pub max_fragmentation_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    pub format: LogFormat,
    #[serde(default)]
    pub dir: Option<String>,
}

impl DaemonConfig {
    /// Load using `KISSAN_CONFIG` (or `kissan.toml`) plus the environment
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let settings = Config::builder()
            .set_default("database.path", DEFAULT_DB_PATH)?
            .set_default("rpc.host", "127.0.0.1")?
            .set_default("rpc.port", 9530)?
            .set_default("rate_limit.burst", 200)?
            .set_default("rate_limit.per_second", 100)?
            .set_default("login.max_attempts", 5)?
            .set_default("login.window_secs", 300)?
            .set_default("session.ttl_minutes", 720)?
            .set_default("maintenance.interval_hours", 6)?
            .set_default("maintenance.max_db_size_mb", 500.0)?
            .set_default("maintenance.max_fragmentation_percent", 10.0)?
            .set_default("log.format", "pretty")?
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("KISSAN")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read configuration ({})", path.display()))?;

        let config: DaemonConfig = settings
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.session.ttl_minutes <= 0 {
            anyhow::bail!("session.ttl_minutes must be positive");
        }
        if self.rate_limit.burst == 0 || self.rate_limit.per_second == 0 {
            anyhow::bail!("rate_limit.burst and rate_limit.per_second must be positive");
        }
        if self.login.max_attempts == 0 || self.login.window_secs == 0 {
            anyhow::bail!("login.max_attempts and login.window_secs must be positive");
        }
        Ok(())
    }

    /// Database file with `~` expanded
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.database.path).into_owned())
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        self.log
            .dir
            .as_deref()
            .map(|dir| PathBuf::from(shellexpand::tilde(dir).into_owned()))
    }

    pub fn rpc_server(&self) -> RpcServerConfig {
        RpcServerConfig {
            host: self.rpc.host.clone(),
            port: self.rpc.port,
            rate_limit_burst: self.rate_limit.burst,
            rate_limit_per_second: self.rate_limit.per_second,
            login_max_attempts: self.login.max_attempts,
            login_window_secs: self.login.window_secs,
        }
    }

    pub fn auth(&self) -> AuthConfig {
        AuthConfig {
            session_ttl_ms: self.session.ttl_minutes * 60 * 1000,
        }
    }

    pub fn maintenance(&self) -> MaintenanceConfig {
        MaintenanceConfig {
            max_db_size_mb: self.maintenance.max_db_size_mb,
            max_fragmentation_percent: self.maintenance.max_fragmentation_percent,
        }
    }
}
