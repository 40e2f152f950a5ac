use std::path::PathBuf;
use std::time::Duration;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for cancelled runs to settle (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Upload/output directories, size ceiling and job retention.
    pub storage: StorageConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                                       |
    /// |------------------------|-----------------------------------------------|
    /// | `HOST`                 | `0.0.0.0`                                     |
    /// | `PORT`                 | `8000`                                        |
    /// | `CORS_ORIGINS`         | `http://localhost:3000,http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                                          |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                                          |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            storage: StorageConfig::from_env(),
        }
    }
}

/// Where media lives and how long jobs are remembered.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Per-upload size ceiling in megabytes.
    pub max_upload_size_mb: u64,
    /// Job record lifetime, counted from creation.
    pub job_ttl: Duration,
    /// How often the expiry sweeper runs.
    pub sweep_interval: Duration,
}

impl StorageConfig {
    /// | Env Var                   | Default     |
    /// |---------------------------|-------------|
    /// | `UPLOAD_DIR`              | `./uploads` |
    /// | `OUTPUT_DIR`              | `./outputs` |
    /// | `MAX_UPLOAD_SIZE_MB`      | `100`       |
    /// | `JOB_TTL_HOURS`           | `24`        |
    /// | `JOB_SWEEP_INTERVAL_SECS` | `300`       |
    pub fn from_env() -> Self {
        let upload_dir = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".into());
        let output_dir = std::env::var("OUTPUT_DIR").unwrap_or_else(|_| "./outputs".into());

        let max_upload_size_mb: u64 = std::env::var("MAX_UPLOAD_SIZE_MB")
            .unwrap_or_else(|_| "100".into())
            .parse()
            .expect("MAX_UPLOAD_SIZE_MB must be a valid u64");

        let job_ttl_hours: u64 = std::env::var("JOB_TTL_HOURS")
            .unwrap_or_else(|_| "24".into())
            .parse()
            .expect("JOB_TTL_HOURS must be a valid u64");

        let sweep_interval_secs: u64 = std::env::var("JOB_SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("JOB_SWEEP_INTERVAL_SECS must be a valid u64");

        Self {
            upload_dir: PathBuf::from(upload_dir),
            output_dir: PathBuf::from(output_dir),
            max_upload_size_mb,
            job_ttl: Duration::from_secs(job_ttl_hours * 60 * 60),
            sweep_interval: Duration::from_secs(sweep_interval_secs.max(1)),
        }
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_size_mb * 1024 * 1024
    }
}
