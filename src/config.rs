use dotenvy::dotenv;
use std::env;
use std::time::Duration;
use url::Url;

use crate::errors::ConfigError;

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: Url,
    /// `None` leaves requests without a deadline.
    pub http_timeout: Option<Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_vars(env::var("API_URL").ok(), env::var("HTTP_TIMEOUT_SECS").ok())
    }

    pub fn from_vars(api_url: Option<String>, timeout: Option<String>) -> Result<Self, ConfigError> {
        let api_url = Url::parse(api_url.as_deref().unwrap_or(DEFAULT_API_URL))?;
        if api_url.cannot_be_a_base() {
            return Err(ConfigError::NotABaseUrl(api_url.into()));
        }
        let secs = match timeout {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidTimeout(raw))?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };
        Ok(Config {
            api_url,
            http_timeout: (secs > 0).then(|| Duration::from_secs(secs)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_vars(None, None).unwrap();
        assert_eq!(config.api_url.as_str(), "http://localhost:3000/api");
        assert_eq!(config.http_timeout, Some(Duration::from_secs(10)));
    }

    #[test]
    fn zero_timeout_disables_deadline() {
        let config = Config::from_vars(Some("https://book.example.com/api".into()), Some("0".into())).unwrap();
        assert_eq!(config.api_url.host_str(), Some("book.example.com"));
        assert!(config.http_timeout.is_none());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            Config::from_vars(Some("not a url".into()), None),
            Err(ConfigError::InvalidApiUrl(_))
        ));
        assert!(matches!(
            Config::from_vars(Some("mailto:x".into()), None),
            Err(ConfigError::NotABaseUrl(url)) if url == "mailto:x"
        ));
        assert!(matches!(
            Config::from_vars(None, Some("soon".into())),
            Err(ConfigError::InvalidTimeout(_))
        ));
    }
}
