use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub database_acquire_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        Ok(Config {
            database_url: env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty()),
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 5)?,
            database_acquire_timeout_secs: parse_or("DATABASE_ACQUIRE_TIMEOUT_SECS", 5)?,
        })
    }

    pub fn require_database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set (or pass --in-memory)"))
    }
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} is not valid: {}", key, e)),
        Err(_) => Ok(default),
    }
}

pub fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            if let Some(slash_pos) = url[..colon_pos].rfind("//") {
                let prefix = &url[..slash_pos + 2];
                let user = &url[slash_pos + 2..colon_pos];
                let suffix = &url[at_pos..];
                return format!("{}{}:****{}", prefix, user, suffix);
            }
        }
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_password_hides_secret() {
        assert_eq!(
            mask_password("postgres://app:hunter2@db:5432/ledger"),
            "postgres://app:****@db:5432/ledger"
        );
    }

    #[test]
    fn test_mask_password_leaves_plain_url() {
        assert_eq!(mask_password("postgres://db/ledger"), "postgres://db/ledger");
    }

    #[test]
    fn test_parse_or_falls_back_to_default() {
        let value: u32 = parse_or("SETTLEMENT_GUARD_TEST_UNSET_KEY", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_parse_or_rejects_garbage() {
        env::set_var("SETTLEMENT_GUARD_TEST_BAD_KEY", "lots");
        let result: anyhow::Result<u32> = parse_or("SETTLEMENT_GUARD_TEST_BAD_KEY", 7);
        assert!(result.is_err());
        env::remove_var("SETTLEMENT_GUARD_TEST_BAD_KEY");
    }
}
