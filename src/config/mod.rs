use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub notes: NotesConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub cors_origins: Vec<String>,
    pub identity: IdentityConfig,
}

/// Settings for the external identity provider.
///
/// Tokens are verified either against the provider's published JWKS
/// (`jwks_url`) or, in development, against a shared HMAC secret
/// (`jwt_secret`). When `secret_key` is present the verified subject is also
/// looked up through the provider's user API at `api_url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub api_url: String,
    #[serde(skip_serializing)]
    pub secret_key: Option<String>,
    pub jwks_url: Option<String>,
    #[serde(skip_serializing)]
    pub jwt_secret: Option<String>,
    pub issuer: Option<String>,
    pub authorized_parties: Vec<String>,
    pub placeholder_email_domain: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotesConfig {
    pub max_title_length: usize,
    pub max_content_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Some(port) = env::var("NOTES_API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|v| v.parse().ok())
        {
            self.server.port = port;
        }

        // Database overrides
        if let Ok(v) = env::var("NOTES_STORE") {
            self.database.backend = match v.as_str() {
                "memory" => StoreBackend::Memory,
                _ => StoreBackend::Postgres,
            };
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // Security overrides
        if let Ok(v) = env::var("CORS_ORIGINS") {
            self.security.cors_origins = split_list(&v);
        }
        let identity = &mut self.security.identity;
        if let Ok(v) = env::var("IDENTITY_API_URL") {
            identity.api_url = v;
        }
        if let Ok(v) = env::var("IDENTITY_SECRET_KEY") {
            identity.secret_key = non_empty(v);
        }
        if let Ok(v) = env::var("IDENTITY_JWKS_URL") {
            identity.jwks_url = non_empty(v);
        }
        if let Ok(v) = env::var("IDENTITY_JWT_SECRET") {
            identity.jwt_secret = non_empty(v);
        }
        if let Ok(v) = env::var("IDENTITY_ISSUER") {
            identity.issuer = non_empty(v);
        }
        if let Ok(v) = env::var("IDENTITY_AUTHORIZED_PARTIES") {
            identity.authorized_parties = split_list(&v);
        }
        if let Ok(v) = env::var("IDENTITY_PLACEHOLDER_EMAIL_DOMAIN") {
            identity.placeholder_email_domain = v;
        }
        if let Ok(v) = env::var("IDENTITY_REQUEST_TIMEOUT_SECS") {
            identity.request_timeout_secs = v.parse().unwrap_or(identity.request_timeout_secs);
        }

        // Note limits
        if let Ok(v) = env::var("NOTES_MAX_TITLE_LENGTH") {
            self.notes.max_title_length = v.parse().unwrap_or(self.notes.max_title_length);
        }
        if let Ok(v) = env::var("NOTES_MAX_CONTENT_BYTES") {
            self.notes.max_content_bytes = v.parse().unwrap_or(self.notes.max_content_bytes);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                run_migrations: true,
            },
            security: SecurityConfig {
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
                identity: IdentityConfig::default(),
            },
            notes: NotesConfig::default(),
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 20,
                connection_timeout: 10,
                run_migrations: true,
            },
            security: SecurityConfig {
                cors_origins: vec!["https://staging.notes.example.com".to_string()],
                identity: IdentityConfig::default(),
            },
            notes: NotesConfig::default(),
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 50,
                connection_timeout: 5,
                run_migrations: false,
            },
            security: SecurityConfig {
                cors_origins: vec!["https://notes.example.com".to_string()],
                identity: IdentityConfig::default(),
            },
            notes: NotesConfig::default(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.clerk.com".to_string(),
            secret_key: None,
            jwks_url: None,
            jwt_secret: None,
            issuer: None,
            authorized_parties: Vec::new(),
            placeholder_email_domain: "no-email.local".to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            max_title_length: 255,
            max_content_bytes: 1024 * 1024, // 1MB
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}
