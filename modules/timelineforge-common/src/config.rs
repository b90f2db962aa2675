use std::env;

use tracing::info;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // AI / search providers
    pub gemini_api_key: String,
    pub tavily_api_key: String,

    // Auth
    pub jwt_secret: String,

    // Web server
    pub web_host: String,
    pub web_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            gemini_api_key: required_env("GEMINI_API_KEY"),
            tavily_api_key: required_env("TAVILY_API_KEY"),
            jwt_secret: required_env("JWT_SECRET"),
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: env::var("WEB_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("WEB_PORT must be a number"),
        }
    }

    /// Log the configuration with secrets redacted.
    pub fn log_redacted(&self) {
        info!(
            database = redact(&self.database_url),
            gemini_key = redact(&self.gemini_api_key),
            tavily_key = redact(&self.tavily_api_key),
            host = self.web_host.as_str(),
            port = self.web_port,
            "Configuration loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn redact(value: &str) -> String {
    if value.len() <= 8 {
        "***".to_string()
    } else {
        format!("{}***", &value[..4])
    }
}
