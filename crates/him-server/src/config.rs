use anyhow::Result;

/// Runtime configuration, read once from the environment. Every tunable the
/// handlers rely on (bonus amount, premium price, password policy) lives here
/// rather than in the code.
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: String,
    pub jwt_secret: String,
    pub session_ttl_days: i64,
    pub daily_bonus: i64,
    pub premium_price: i64,
    pub min_password_len: usize,
    pub bonus_cooldown_secs: u64,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: env_or("HIM_HOST", "0.0.0.0"),
            port: env_or("HIM_PORT", "3000").parse()?,
            db_path: env_or("HIM_DB_PATH", "him.db"),
            jwt_secret: env_or("HIM_JWT_SECRET", "dev-secret-change-me"),
            session_ttl_days: env_or("HIM_SESSION_TTL_DAYS", "7").parse()?,
            daily_bonus: env_or("HIM_DAILY_BONUS", "100").parse()?,
            premium_price: env_or("HIM_PREMIUM_PRICE", "500").parse()?,
            min_password_len: env_or("HIM_MIN_PASSWORD_LEN", "6").parse()?,
            // 0 keeps the legacy behavior: the daily bonus can be claimed
            // any number of times. Set 86400 for a real once-a-day gate.
            bonus_cooldown_secs: env_or("HIM_BONUS_COOLDOWN_SECS", "0").parse()?,
            admin_username: std::env::var("HIM_ADMIN_USERNAME").ok(),
            admin_password: std::env::var("HIM_ADMIN_PASSWORD").ok(),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
