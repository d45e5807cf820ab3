/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
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
    /// Directory where generated bulk sheets are written.
    pub bulk_output_dir: String,
    /// How often the materializer polls for created jobs, in seconds.
    pub materializer_interval_secs: u64,
    /// Upper bound on a single job's materialization, in seconds. Jobs
    /// running past this are failed, never left processing forever.
    pub materializer_timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default         |
    /// |------------------------------|-----------------|
    /// | `HOST`                       | `0.0.0.0`       |
    /// | `PORT`                       | `3000`          |
    /// | `CORS_ORIGINS`               | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`            |
    /// | `BULK_OUTPUT_DIR`            | `./bulk_output` |
    /// | `MATERIALIZER_INTERVAL_SECS` | `5`             |
    /// | `MATERIALIZER_TIMEOUT_SECS`  | `60`            |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let bulk_output_dir =
            std::env::var("BULK_OUTPUT_DIR").unwrap_or_else(|_| "./bulk_output".into());

        let materializer_interval_secs: u64 = std::env::var("MATERIALIZER_INTERVAL_SECS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("MATERIALIZER_INTERVAL_SECS must be a valid u64");

        let materializer_timeout_secs: u64 = std::env::var("MATERIALIZER_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("MATERIALIZER_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            bulk_output_dir,
            materializer_interval_secs,
            materializer_timeout_secs,
        }
    }
}
