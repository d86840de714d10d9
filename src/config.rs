use std::str::FromStr;

/// One year; keeps `now + ttl` well inside the representable calendar.
pub const MAX_SESSION_TTL_MINUTES: i64 = 365 * 24 * 60;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ttl_minutes: i64,
    pub cookie_secure: bool,
    /// Period of the expired-session sweeper; 0 disables it.
    pub sweep_secs: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Absent means the in-memory stores are used.
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub session: SessionConfig,
    pub store_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl SessionConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            (1..=MAX_SESSION_TTL_MINUTES).contains(&self.ttl_minutes),
            "SESSION_TTL_MINUTES must be between 1 and {MAX_SESSION_TTL_MINUTES}, got {}",
            self.ttl_minutes
        );
        Ok(())
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());
        let session = SessionConfig {
            ttl_minutes: env_or("SESSION_TTL_MINUTES", 12 * 60)?,
            cookie_secure: env_or("SESSION_COOKIE_SECURE", false)?,
            sweep_secs: env_or("SESSION_SWEEP_SECS", 300)?,
        };
        session.validate()?;
        Ok(Self {
            database_url,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("APP_PORT", 8080)?,
            session,
            store_timeout_secs: env_or("STORE_TIMEOUT_SECS", 5)?,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30)?,
        })
    }

    pub fn session_ttl(&self) -> time::Duration {
        time::Duration::minutes(self.session.ttl_minutes)
    }

    pub fn store_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.store_timeout_secs)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: None,
            host: "127.0.0.1".into(),
            port: 0,
            session: SessionConfig {
                ttl_minutes: 12 * 60,
                cookie_secure: false,
                sweep_secs: 0,
            },
            store_timeout_secs: 5,
            request_timeout_secs: 30,
        }
    }
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid {key}={raw:?}: {e}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(ttl_minutes: i64) -> SessionConfig {
        SessionConfig {
            ttl_minutes,
            cookie_secure: false,
            sweep_secs: 0,
        }
    }

    #[test]
    fn session_ttl_is_bounded() {
        assert!(session(1).validate().is_ok());
        assert!(session(12 * 60).validate().is_ok());
        assert!(session(MAX_SESSION_TTL_MINUTES).validate().is_ok());

        for ttl in [0, -5, MAX_SESSION_TTL_MINUTES + 1, i64::MAX] {
            let err = session(ttl).validate().unwrap_err();
            assert!(err.to_string().contains("SESSION_TTL_MINUTES"), "{ttl}");
        }
    }

    #[test]
    fn test_config_is_valid() {
        let config = AppConfig::for_tests();
        assert!(config.session.validate().is_ok());
        assert_eq!(config.session_ttl(), time::Duration::hours(12));
    }
}
