use std::env;
use tracing::warn;

pub const DEFAULT_ORDER_COOLDOWN_DAYS: i64 = 30;
pub const DEFAULT_API_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_key: String,
    /// Days a patient must wait between two privilege claims (`ORDER_COOLDOWN_DAYS`).
    pub order_cooldown_days: i64,
    pub api_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_service_key: env::var("SUPABASE_SERVICE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_KEY not set, using empty value");
                    String::new()
                }),
            order_cooldown_days: parse_or_default(
                "ORDER_COOLDOWN_DAYS",
                env::var("ORDER_COOLDOWN_DAYS").ok(),
                DEFAULT_ORDER_COOLDOWN_DAYS,
            ),
            api_port: parse_or_default("API_PORT", env::var("API_PORT").ok(), DEFAULT_API_PORT),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_service_key.is_empty()
    }
}

fn parse_or_default<T>(name: &str, raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match raw {
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", name, value, default);
            default
        }),
        None => {
            warn!("{} not set, using default {}", name, default);
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_default_reads_valid_integer() {
        assert_eq!(parse_or_default("ORDER_COOLDOWN_DAYS", Some(" 14 ".to_string()), 30i64), 14);
    }

    #[test]
    fn test_parse_or_default_falls_back() {
        assert_eq!(parse_or_default("ORDER_COOLDOWN_DAYS", Some("two weeks".to_string()), 30i64), 30);
        assert_eq!(parse_or_default("API_PORT", None, 3000u16), 3000);
    }

    #[test]
    fn test_is_configured() {
        let mut config = AppConfig {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "key".to_string(),
            order_cooldown_days: 30,
            api_port: 3000,
        };
        assert!(config.is_configured());

        config.supabase_service_key.clear();
        assert!(!config.is_configured());
    }
}
