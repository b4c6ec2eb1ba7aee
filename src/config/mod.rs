use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub links: LinkConfig,
    pub storage: StorageConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub max_request_size_bytes: usize,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Prepended verbatim to the modify path; empty yields a relative link.
    pub public_base_url: String,
    pub modify_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Sheets,
    Memory,
}

impl StoreBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "database" | "db" => Some(StoreBackend::Postgres),
            "sheets" | "sheet" | "google-sheets" => Some(StoreBackend::Sheets),
            "memory" | "mem" => Some(StoreBackend::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StoreBackend,
    #[serde(skip_serializing)]
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub database_connection_timeout: u64,
    pub sheets: SheetsConfig,
    /// Copy member upserts into the spreadsheet when the database is primary.
    pub sheet_mirror: bool,
    /// Group names created at startup when missing.
    pub seed_groups: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    pub spreadsheet_id: Option<String>,
    pub members_tab: String,
    pub groups_tab: String,
    pub api_base: String,
    #[serde(skip_serializing)]
    pub service_account_json: Option<String>,
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub mod_link_secret: Option<String>,
    pub cors_origins: Vec<String>,
}

pub const DEFAULT_PORT: u16 = 5010;
pub const DEFAULT_MODIFY_PATH: &str = "/modifyRecord";
pub const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com";

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(v) = env_var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Some(v) = env_var("API_MAX_REQUEST_SIZE_BYTES") {
            self.server.max_request_size_bytes = v.parse().unwrap_or(self.server.max_request_size_bytes);
        }
        if let Some(v) = env_var("API_ENABLE_REQUEST_LOGGING") {
            self.server.enable_request_logging = v.parse().unwrap_or(self.server.enable_request_logging);
        }

        // Link overrides
        if let Some(v) = env_var("PUBLIC_BASE_URL") {
            self.links.public_base_url = v;
        }
        if let Some(v) = env_var("CLIENT_MODIFY_PATH") {
            self.links.modify_path = v;
        }

        // Storage overrides
        if let Some(v) = env_var("STORE_BACKEND") {
            self.storage.backend = StoreBackend::parse(&v).unwrap_or(self.storage.backend);
        }
        self.storage.database_url = env_var("DATABASE_URL");
        if let Some(v) = env_var("DATABASE_MAX_CONNECTIONS") {
            self.storage.database_max_connections = v.parse().unwrap_or(self.storage.database_max_connections);
        }
        if let Some(v) = env_var("DATABASE_CONNECTION_TIMEOUT") {
            self.storage.database_connection_timeout = v.parse().unwrap_or(self.storage.database_connection_timeout);
        }
        if let Some(v) = env_var("SHEET_MIRROR") {
            self.storage.sheet_mirror = v.parse().unwrap_or(self.storage.sheet_mirror);
        }
        if let Some(v) = env_var("SEED_GROUPS") {
            self.storage.seed_groups = split_list(&v);
        }

        // Spreadsheet overrides
        self.storage.sheets.spreadsheet_id = env_var("SHEET_ID");
        if let Some(v) = env_var("SHEET_TAB") {
            self.storage.sheets.members_tab = v;
        }
        if let Some(v) = env_var("SHEET_GROUPS_TAB") {
            self.storage.sheets.groups_tab = v;
        }
        if let Some(v) = env_var("SHEETS_API_BASE") {
            self.storage.sheets.api_base = v;
        }
        self.storage.sheets.service_account_json = env_var("GOOGLE_SERVICE_ACCOUNT_JSON");
        self.storage.sheets.access_token = env_var("GOOGLE_ACCESS_TOKEN");

        // Security overrides
        self.security.mod_link_secret = env_var("MOD_LINK_SECRET");
        if let Some(v) = env_var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = split_list(&v);
        }

        self
    }

    /// Local development defaults: in-memory store, permissive CORS.
    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: DEFAULT_PORT,
                max_request_size_bytes: 1024 * 1024, // 1MB
                enable_request_logging: true,
            },
            links: LinkConfig {
                public_base_url: "http://localhost:3000".to_string(),
                modify_path: DEFAULT_MODIFY_PATH.to_string(),
            },
            storage: StorageConfig {
                backend: StoreBackend::Memory,
                database_url: None,
                database_max_connections: 5,
                database_connection_timeout: 30,
                sheets: SheetsConfig::default(),
                sheet_mirror: false,
                seed_groups: Vec::new(),
            },
            security: SecurityConfig {
                mod_link_secret: None,
                // empty list means any origin is allowed
                cors_origins: Vec::new(),
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: DEFAULT_PORT,
                max_request_size_bytes: 1024 * 1024,
                enable_request_logging: true,
            },
            links: LinkConfig {
                public_base_url: String::new(),
                modify_path: DEFAULT_MODIFY_PATH.to_string(),
            },
            storage: StorageConfig {
                backend: StoreBackend::Postgres,
                database_url: None,
                database_max_connections: 10,
                database_connection_timeout: 10,
                sheets: SheetsConfig::default(),
                sheet_mirror: true,
                seed_groups: Vec::new(),
            },
            security: SecurityConfig {
                mod_link_secret: None,
                cors_origins: Vec::new(),
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: DEFAULT_PORT,
                max_request_size_bytes: 1024 * 1024,
                enable_request_logging: false,
            },
            links: LinkConfig {
                public_base_url: String::new(),
                modify_path: DEFAULT_MODIFY_PATH.to_string(),
            },
            storage: StorageConfig {
                backend: StoreBackend::Postgres,
                database_url: None,
                database_max_connections: 20,
                database_connection_timeout: 5,
                sheets: SheetsConfig::default(),
                sheet_mirror: true,
                seed_groups: Vec::new(),
            },
            security: SecurityConfig {
                mod_link_secret: None,
                cors_origins: Vec::new(),
            },
        }
    }
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: None,
            members_tab: "Sheet1".to_string(),
            groups_tab: "Groups".to_string(),
            api_base: DEFAULT_SHEETS_API_BASE.to_string(),
            service_account_json: None,
            access_token: None,
        }
    }
}

/// Non-empty, trimmed environment value.
fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.storage.backend, StoreBackend::Memory);
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.links.modify_path, "/modifyRecord");
        assert_eq!(config.server.max_request_size_bytes, 1024 * 1024);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.storage.backend, StoreBackend::Postgres);
        assert!(config.storage.sheet_mirror);
        assert!(!config.server.enable_request_logging);
    }

    #[test]
    fn test_store_backend_parse() {
        assert_eq!(StoreBackend::parse("Postgres"), Some(StoreBackend::Postgres));
        assert_eq!(StoreBackend::parse(" sheets "), Some(StoreBackend::Sheets));
        assert_eq!(StoreBackend::parse("memory"), Some(StoreBackend::Memory));
        assert_eq!(StoreBackend::parse("mongo"), None);
    }

    #[test]
    fn test_split_list_drops_blanks() {
        assert_eq!(split_list("Tax, IP,, ,M&A"), vec!["Tax", "IP", "M&A"]);
    }

    #[test]
    fn test_secrets_are_not_serialized() {
        let mut config = AppConfig::development();
        config.security.mod_link_secret = Some("hunter2".into());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("hunter2"));
    }
}
