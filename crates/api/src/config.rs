use querybank_db::registry::TenantSettings;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development. In production,
/// override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Echo the failing statement, binds and driver message in execution
    /// error responses (default: `true`).
    pub expose_execution_details: bool,
    /// Tenant databases reachable for query execution.
    pub tenants: TenantSettings,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                 |
    /// |----------------------------|-------------------------|
    /// | `HOST`                     | `0.0.0.0`               |
    /// | `PORT`                     | `3000`                  |
    /// | `CORS_ORIGINS`             | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`     | `30`                    |
    /// | `EXPOSE_EXECUTION_DETAILS` | `true`                  |
    /// | `DATA_DB_HOST`             | `localhost`             |
    /// | `DATA_DB_PORT`             | `5432`                  |
    /// | `DATA_DB_USER`             | `postgres`              |
    /// | `DATA_DB_PASSWORD`         | (none)                  |
    /// | `DATA_DB_NAMES`            | (none)                  |
    /// | `DATA_DB_MAX_CONNECTIONS`  | `10`                    |
    ///
    /// Panics on unparseable numeric or boolean values so misconfiguration
    /// fails at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins = split_list(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let expose_execution_details: bool = std::env::var("EXPOSE_EXECUTION_DETAILS")
            .unwrap_or_else(|_| "true".into())
            .parse()
            .expect("EXPOSE_EXECUTION_DETAILS must be true or false");

        let tenants = TenantSettings {
            host: std::env::var("DATA_DB_HOST").unwrap_or_else(|_| "localhost".into()),
            port: std::env::var("DATA_DB_PORT")
                .unwrap_or_else(|_| "5432".into())
                .parse()
                .expect("DATA_DB_PORT must be a valid u16"),
            username: std::env::var("DATA_DB_USER").unwrap_or_else(|_| "postgres".into()),
            password: std::env::var("DATA_DB_PASSWORD")
                .ok()
                .filter(|p| !p.is_empty()),
            max_connections: std::env::var("DATA_DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".into())
                .parse()
                .expect("DATA_DB_MAX_CONNECTIONS must be a valid u32"),
            names: split_list(&std::env::var("DATA_DB_NAMES").unwrap_or_default()),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            expose_execution_details,
            tenants,
        }
    }
}

/// Split a comma-separated env value, dropping blanks.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
