use serde::Deserialize;

pub const DEFAULT_LEAD_TITLE_PREFIX: &str = "App";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Deserialize)]
pub struct Config {
    pub api_token: String,
    pub base_url: String,
    /// Prefix of minimal lead titles (`"<prefix>: <email>"`).
    pub lead_title_prefix: String,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_token", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("lead_title_prefix", &self.lead_title_prefix)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Config {
    /// Builds a config with default prefix and timeout.
    pub fn new(api_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            base_url: base_url.into(),
            lead_title_prefix: DEFAULT_LEAD_TITLE_PREFIX.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_lead_title_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.lead_title_prefix = prefix.into();
        self
    }

    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            api_token: std::env::var("PIPEDRIVE_API_TOKEN")
                .map_err(|_| anyhow::anyhow!("PIPEDRIVE_API_TOKEN environment variable required"))
                .and_then(|token| {
                    if token.trim().is_empty() {
                        anyhow::bail!("PIPEDRIVE_API_TOKEN cannot be empty");
                    }
                    Ok(token)
                })?,
            base_url: std::env::var("PIPEDRIVE_BASE_URL")
                .map_err(|_| anyhow::anyhow!("PIPEDRIVE_BASE_URL environment variable required"))
                .and_then(|raw| validate_base_url(&raw).map(|_| raw))?,
            lead_title_prefix: std::env::var("PIPEDRIVE_LEAD_TITLE_PREFIX")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LEAD_TITLE_PREFIX.to_string()),
            timeout_secs: std::env::var("PIPEDRIVE_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_TIMEOUT_SECS.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PIPEDRIVE_TIMEOUT_SECS must be a whole number"))?,
        };

        // Never log the token itself
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Pipedrive Base URL: {}", config.base_url);
        tracing::debug!("Lead title prefix: {}", config.lead_title_prefix);
        tracing::debug!("HTTP timeout: {}s", config.timeout_secs);

        Ok(config)
    }
}

/// Checks that `raw` is an absolute http(s) URL.
pub fn validate_base_url(raw: &str) -> anyhow::Result<url::Url> {
    if raw.trim().is_empty() {
        anyhow::bail!("PIPEDRIVE_BASE_URL cannot be empty");
    }
    let parsed = url::Url::parse(raw)
        .map_err(|e| anyhow::anyhow!("PIPEDRIVE_BASE_URL is not a valid URL: {}", e))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("PIPEDRIVE_BASE_URL must start with http:// or https://");
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new("token", "https://acme.pipedrive.com");
        assert_eq!(config.lead_title_prefix, "App");
        assert_eq!(config.timeout_secs, 30);

        let config = config.with_lead_title_prefix("Signup");
        assert_eq!(config.lead_title_prefix, "Signup");
    }

    #[test]
    fn test_debug_hides_token() {
        let config = Config::new("super-secret", "https://acme.pipedrive.com");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("acme.pipedrive.com"));
    }

    #[test]
    fn test_base_url_validation() {
        assert!(validate_base_url("https://acme.pipedrive.com").is_ok());
        assert!(validate_base_url("http://localhost:8080").is_ok());
        assert!(validate_base_url("").is_err());
        assert!(validate_base_url("ftp://acme.pipedrive.com").is_err());
        assert!(validate_base_url("acme.pipedrive.com").is_err());
    }
}
