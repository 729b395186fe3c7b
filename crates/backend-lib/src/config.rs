// ============================
// pushrelay-backend-lib/src/config.rs
// ============================
//! Configuration management.
use anyhow::{bail, Result};
use axum::http::HeaderValue;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "pushrelay.toml";

/// Prefix for environment overrides, sections separated by `__`
pub const ENV_PREFIX: &str = "PUSHRELAY_";

/// Signing secret used when none is configured. Startup warns about it.
pub const INSECURE_DEFAULT_SECRET: &str = "change-me-in-production";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub auth: AuthSettings,
    pub push: PushSettings,
    pub cors: CorsSettings,
    /// Log level, overridden by `RUST_LOG`
    pub log_level: String,
    /// `pretty` or `json`
    pub log_format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Directory holding the user document file
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// HMAC secret for session tokens
    pub jwt_secret: String,
    /// Session lifetime in seconds
    pub session_ttl_secs: u64,
    /// scrypt cost as log2(N)
    pub hash_cost: u8,
    /// Reserved bootstrap administrator
    pub admin_username: String,
    pub admin_email: String,
    pub admin_password: String,
    /// Accept `userId`/`username` in the subscribe body when no token is sent
    pub legacy_identity: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushSettings {
    /// JSON file with the VAPID key pair
    pub keys_file: PathBuf,
    /// Inline keys take precedence over `keys_file`
    pub public_key: Option<String>,
    pub private_key: Option<String>,
    /// VAPID `sub` claim, a `mailto:` or `https:` URL
    pub subject: String,
    /// TTL hint handed to the push service, in seconds
    pub ttl_secs: u32,
    /// Icon path embedded in every payload
    pub icon: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsSettings {
    pub allowed_origins: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            storage: StorageSettings::default(),
            auth: AuthSettings::default(),
            push: PushSettings::default(),
            cors: CorsSettings::default(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data"),
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: INSECURE_DEFAULT_SECRET.to_string(),
            session_ttl_secs: 60 * 60 * 24 * 7, // 7 days
            hash_cost: 15,
            admin_username: "juan".to_string(),
            admin_email: "juan@local".to_string(),
            admin_password: "123".to_string(),
            legacy_identity: true,
        }
    }
}

impl Default for PushSettings {
    fn default() -> Self {
        Self {
            keys_file: PathBuf::from("keys.json"),
            public_key: None,
            private_key: None,
            subject: "mailto:admin@example.com".to_string(),
            ttl_secs: 60,
            icon: "/assets/img/icon3.png".to_string(),
        }
    }
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}

impl Settings {
    /// Load from `pushrelay.toml` (if present) and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load from a specific TOML file (if present) and the environment
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings: Settings = Self::figment(path.as_ref()).extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Provider chain: defaults, file, `PUSHRELAY_*`, then the bare `PORT`
    /// and `JWT_SECRET` variables older deployments set.
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Env::raw().only(&["PORT"]).map(|_| "server.port".into()))
            .merge(
                Env::raw()
                    .only(&["JWT_SECRET"])
                    .map(|_| "auth.jwt_secret".into()),
            )
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            bail!("invalid log level: {}", self.log_level);
        }
        if self.log_format != "pretty" && self.log_format != "json" {
            bail!("log_format must be `pretty` or `json`, got {}", self.log_format);
        }
        if self.auth.session_ttl_secs == 0 {
            bail!("auth.session_ttl_secs must be greater than zero");
        }
        if self.auth.jwt_secret.is_empty() {
            bail!("auth.jwt_secret must not be empty");
        }
        if !(1..=20).contains(&self.auth.hash_cost) {
            bail!("auth.hash_cost must be between 1 and 20");
        }
        if self.auth.admin_username.trim().is_empty() {
            bail!("auth.admin_username must not be empty");
        }
        for origin in &self.cors.allowed_origins {
            // credentials are allowed, which rules out a wildcard origin
            if origin.trim() == "*" || HeaderValue::from_str(origin).is_err() {
                bail!("invalid CORS origin: {origin}");
            }
        }
        self.bind_addr()?;
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.server.host, self.server.port).parse()?)
    }

    pub fn uses_default_secret(&self) -> bool {
        self.auth.jwt_secret == INSECURE_DEFAULT_SECRET
    }
}

#[cfg(test)]
mod config_tests;
