use argon2::Params;
use rocket::figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "Contacts.toml";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub cors: CorsConfig,
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub password: PasswordConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: u64,
    /// Upper bound for a single statement, in seconds.
    pub statement_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub address: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub json_format: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    pub enable_swagger: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionConfig {
    pub access_token_ttl_seconds: i64,
    pub refresh_token_ttl_seconds: i64,
    /// Marks the session cookies `Secure`. Only disable for local HTTP development.
    pub cookie_secure: bool,
}

/// Argon2id cost parameters. Defaults follow the argon2 crate's recommended values.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PasswordConfig {
    pub memory_cost_kib: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/contacts_db".to_string(),
            max_connections: 16,
            min_connections: 4,
            acquire_timeout: 5,
            statement_timeout: 5,
            run_migrations: true,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            address: "127.0.0.1".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".to_string(), "http://localhost:3001".to_string()],
            allow_credentials: true,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { enable_swagger: true }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            access_token_ttl_seconds: 15 * 60,
            refresh_token_ttl_seconds: 30 * 24 * 60 * 60,
            cookie_secure: true,
        }
    }
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_cost_kib: Params::DEFAULT_M_COST,
            time_cost: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl PasswordConfig {
    pub fn argon2_params(&self) -> Result<Params, argon2::Error> {
        Params::new(self.memory_cost_kib, self.time_cost, self.parallelism, None)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("database.url must start with postgres:// or postgresql://")]
    DatabaseUrl,
    #[error("database.min_connections ({min}) exceeds database.max_connections ({max})")]
    PoolSize { min: u32, max: u32 },
    #[error("server.port must be non-zero")]
    Port,
    #[error("session token lifetimes must be positive and the access token must expire before the refresh token")]
    TokenLifetimes,
    #[error("cors: wildcard origins (*) cannot be combined with credentials")]
    CorsWildcardWithCredentials,
    #[error("invalid password hashing parameters: {0}")]
    PasswordParams(argon2::Error),
}

impl Config {
    /// Load configuration from multiple sources in priority order:
    /// 1. Built-in defaults
    /// 2. Contacts.toml (if it exists)
    /// 3. Environment variables prefixed with CONTACTS_, sections separated by `__`
    ///    (e.g. CONTACTS_SESSION__COOKIE_SECURE=false)
    /// 4. DATABASE_URL and PORT
    pub fn load() -> Result<Self, ConfigError> {
        let figment = Self::file_figment(DEFAULT_CONFIG_FILE)
            .merge(Env::prefixed("CONTACTS_").split("__"))
            .merge(Env::raw().only(&["DATABASE_URL"]).map(|_| "database.url".into()))
            .merge(Env::raw().only(&["PORT"]).map(|_| "server.port".into()));

        let config: Config = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with a TOML file whose top-level tables are config sections.
    fn file_figment(path: impl AsRef<std::path::Path>) -> Figment {
        Figment::new().merge(Serialized::defaults(Config::default())).merge(Toml::file(path))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.database.url.trim();
        if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
            return Err(ConfigError::DatabaseUrl);
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::PoolSize {
                min: self.database.min_connections,
                max: self.database.max_connections,
            });
        }

        if self.server.port == 0 {
            return Err(ConfigError::Port);
        }

        let session = &self.session;
        if session.access_token_ttl_seconds <= 0 || session.refresh_token_ttl_seconds <= session.access_token_ttl_seconds {
            return Err(ConfigError::TokenLifetimes);
        }

        if self.cors.allow_credentials && self.cors.allowed_origins.iter().any(|origin| origin == "*") {
            return Err(ConfigError::CorsWildcardWithCredentials);
        }

        self.password.argon2_params().map_err(ConfigError::PasswordParams)?;

        Ok(())
    }
}
