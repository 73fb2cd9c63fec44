use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "MedScan";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default OpenRouter endpoint (OpenAI-compatible chat completions).
pub const DEFAULT_MODEL_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";
pub const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_BIND: &str = "127.0.0.1:5000";
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";

/// 50 MiB, same ceiling the web client enforces before uploading.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// PBKDF2 rounds for new password hashes. Existing hashes carry their own count.
pub const DEFAULT_PASSWORD_ITERATIONS: u32 = 600_000;

/// Bearer tokens live for 7 days.
pub const TOKEN_TTL_SECS: i64 = 7 * 24 * 3600;

/// Get the application data directory
/// ~/MedScan/ unless `MEDSCAN_DATA_DIR` says otherwise.
pub fn app_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("MEDSCAN_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_NAME)
}

/// Default log filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "medscan=info,medscan_lib=info,tower_http=info"
}

/// Runtime configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub model_api_key: Option<String>,
    pub model_base_url: String,
    pub model: String,
    pub model_timeout: Duration,
    pub frontend_url: String,
    /// Development mode exposes error details in API responses.
    pub development: bool,
    pub max_upload_bytes: usize,
    pub tessdata_dir: Option<PathBuf>,
    pub password_iterations: u32,
}

impl ServerConfig {
    /// Build the configuration from environment variables.
    ///
    /// Unparseable values fall back to defaults with a warning rather than
    /// aborting startup.
    pub fn from_env() -> Self {
        let mut bind_addr: SocketAddr = env_or("MEDSCAN_BIND", DEFAULT_BIND)
            .parse()
            .unwrap_or_else(|_| {
                tracing::warn!("MEDSCAN_BIND is not a socket address, using {DEFAULT_BIND}");
                SocketAddr::from(([127, 0, 0, 1], 5000))
            });
        if let Some(port) = env_parse::<u16>("PORT") {
            bind_addr.set_port(port);
        }

        let environment = std::env::var("MEDSCAN_ENV")
            .or_else(|_| std::env::var("NODE_ENV"))
            .unwrap_or_else(|_| "production".to_string());

        Self {
            bind_addr,
            data_dir: app_data_dir(),
            model_api_key: std::env::var("OPENROUTER_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            model_base_url: env_or("OPENROUTER_BASE_URL", DEFAULT_MODEL_BASE_URL),
            model: env_or("OPENROUTER_MODEL", DEFAULT_MODEL),
            model_timeout: Duration::from_secs(
                env_parse("MEDSCAN_MODEL_TIMEOUT_SECS").unwrap_or(DEFAULT_MODEL_TIMEOUT_SECS),
            ),
            frontend_url: env_or("FRONTEND_URL", DEFAULT_FRONTEND_URL),
            development: environment.eq_ignore_ascii_case("development"),
            max_upload_bytes: env_parse("MEDSCAN_MAX_UPLOAD_BYTES")
                .or_else(|| env_parse("MAX_FILE_SIZE"))
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            tessdata_dir: std::env::var("TESSDATA_PREFIX").ok().map(PathBuf::from),
            password_iterations: env_parse("MEDSCAN_PASSWORD_ITERATIONS")
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_PASSWORD_ITERATIONS),
        }
    }

    /// Configuration rooted at `data_dir` with every other value defaulted.
    /// Used by tests and embedders that wire their own collaborators.
    pub fn for_data_dir(data_dir: PathBuf) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            data_dir,
            model_api_key: None,
            model_base_url: DEFAULT_MODEL_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            model_timeout: Duration::from_secs(DEFAULT_MODEL_TIMEOUT_SECS),
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            development: false,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            tessdata_dir: None,
            password_iterations: DEFAULT_PASSWORD_ITERATIONS,
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("medscan.db")
    }

    pub fn upload_root(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable environment value");
            None
        }
    }
}
