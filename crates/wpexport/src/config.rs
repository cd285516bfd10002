use crate::prelude::*;

/// WordPress connection settings.
///
/// The API root comes from the CLI (flag or `API_URL`); credentials come
/// from `WORDPRESS_USER` / `WORDPRESS_PASSWORD` and are optional as a pair.
/// Without them every request is anonymous.
#[derive(Debug, Clone)]
pub struct WpConfig {
    pub api_url: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl WpConfig {
    /// Build settings from the resolved API root plus credential
    /// environment variables.
    pub fn from_env(api_url: String) -> Self {
        Self {
            api_url,
            user: std::env::var("WORDPRESS_USER").ok(),
            password: std::env::var("WORDPRESS_PASSWORD").ok(),
        }
    }

    /// Basic auth header value when both credentials are present.
    pub fn auth_header(&self) -> Option<String> {
        use base64::Engine;

        match (&self.user, &self.password) {
            (Some(user), Some(password)) => {
                let encoded = base64::engine::general_purpose::STANDARD
                    .encode(format!("{user}:{password}"));
                Some(format!("Basic {encoded}"))
            }
            _ => None,
        }
    }
}

/// Resolve the API root from the global options.
pub fn require_api_url(global: &crate::Global) -> Result<String> {
    global
        .api_url
        .clone()
        .ok_or_eyre("API_URL is not set (use --api-url or the API_URL environment variable)")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(user: Option<&str>, password: Option<&str>) -> WpConfig {
        WpConfig {
            api_url: "https://example.org/wp-json/wp/v2/".to_string(),
            user: user.map(str::to_string),
            password: password.map(str::to_string),
        }
    }

    #[test]
    fn test_auth_header_encodes_credentials() {
        let header = config(Some("user"), Some("pass")).auth_header();
        assert_eq!(header.as_deref(), Some("Basic dXNlcjpwYXNz"));
    }

    #[test]
    fn test_auth_header_requires_both_credentials() {
        assert!(config(None, None).auth_header().is_none());
        assert!(config(Some("user"), None).auth_header().is_none());
        assert!(config(None, Some("pass")).auth_header().is_none());
    }
}
