use std::env;

/// Per-IP rate limit tiers, in requests per minute.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub standard_rpm: u32,
    pub relaxed_rpm: u32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub audit_database_path: String,
    /// Prefix a key must carry to encode a duration (`<PREFIX>-<N>D-...`).
    pub license_key_prefix: String,
    pub access_log_enabled: bool,
    pub rate_limit: RateLimitConfig,
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("KEYGATE_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "keygate.db".to_string()),
            audit_database_path: env::var("AUDIT_DATABASE_PATH")
                .unwrap_or_else(|_| "keygate_audit.db".to_string()),
            license_key_prefix: env::var("LICENSE_KEY_PREFIX")
                .unwrap_or_else(|_| "HAMSTER".to_string()),
            access_log_enabled: env::var("ACCESS_LOG_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            rate_limit: RateLimitConfig {
                standard_rpm: env_rpm("RATE_LIMIT_STANDARD_RPM", 30),
                relaxed_rpm: env_rpm("RATE_LIMIT_RELAXED_RPM", 60),
            },
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_rpm(var: &str, default: u32) -> u32 {
    env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|rpm| *rpm > 0)
        .unwrap_or(default)
}
