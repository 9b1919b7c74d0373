use crate::{
    error::{DynRestError, DynRestResult},
    storage::DEFAULT_STORAGE_KEY,
};
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_LOGIN_URL: &str = "/signin";
pub const DEFAULT_HOME_PATH: &str = "/";

/// Client configuration.
///
/// Everything here is fixed once the client is built; the session token is
/// the only mutable state and lives in [`crate::Session`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub server_url: String,
    /// Initial session token; when absent the stored token is used
    pub token: Option<String>,
    /// Token for the service-role module set; falls back to `token`
    pub service_token: Option<String>,
    pub storage_key: String,
    pub login_url: String,
    pub home_path: String,
}

impl ClientConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            token: None,
            service_token: None,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            login_url: DEFAULT_LOGIN_URL.to_string(),
            home_path: DEFAULT_HOME_PATH.to_string(),
        }
    }

    /// Load configuration from `DYNREST_*` environment variables.
    ///
    /// `DYNREST_SERVER_URL` is required; everything else has a default.
    pub fn from_env() -> DynRestResult<Self> {
        let server_url = std::env::var("DYNREST_SERVER_URL")
            .map_err(|_| DynRestError::config_error("DYNREST_SERVER_URL is not set"))?;
        let mut config = Self::new(server_url);
        config.token = std::env::var("DYNREST_TOKEN").ok();
        config.service_token = std::env::var("DYNREST_SERVICE_TOKEN").ok();
        if let Ok(key) = std::env::var("DYNREST_STORAGE_KEY") {
            config.storage_key = key;
        }
        if let Ok(login) = std::env::var("DYNREST_LOGIN_URL") {
            config.login_url = login;
        }
        if let Ok(home) = std::env::var("DYNREST_HOME_PATH") {
            config.home_path = home;
        }
        Ok(config)
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_service_token(mut self, token: impl Into<String>) -> Self {
        self.service_token = Some(token.into());
        self
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn with_login_url(mut self, url: impl Into<String>) -> Self {
        self.login_url = url.into();
        self
    }

    pub fn with_home_path(mut self, path: impl Into<String>) -> Self {
        self.home_path = path.into();
        self
    }

    /// Validate and normalize the server URL so it always ends with `/`
    pub fn base_url(&self) -> DynRestResult<Url> {
        if self.server_url.trim().is_empty() {
            return Err(DynRestError::config_error("serverUrl is required"));
        }
        let mut base = self.server_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Ok(Url::parse(&base)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::new("http://api.test");
        assert_eq!(config.storage_key, "access_token");
        assert_eq!(config.login_url, "/signin");
        assert_eq!(config.home_path, "/");
    }

    #[test]
    fn base_url_gains_trailing_slash_once() {
        let a = ClientConfig::new("http://api.test/v1").base_url().unwrap();
        let b = ClientConfig::new("http://api.test/v1/").base_url().unwrap();
        assert_eq!(a.as_str(), "http://api.test/v1/");
        assert_eq!(a, b);
    }

    const ENV_VARS: [&str; 6] = [
        "DYNREST_SERVER_URL",
        "DYNREST_TOKEN",
        "DYNREST_SERVICE_TOKEN",
        "DYNREST_STORAGE_KEY",
        "DYNREST_LOGIN_URL",
        "DYNREST_HOME_PATH",
    ];

    // one test owns the DYNREST_* variables so parallel tests never race on them
    #[test]
    fn from_env_requires_server_url_and_applies_overrides() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
        let err = ClientConfig::from_env().unwrap_err();
        assert!(matches!(err, DynRestError::Configuration(_)));
        assert_eq!(err.to_string(), "Invalid configuration: DYNREST_SERVER_URL is not set");

        std::env::set_var("DYNREST_SERVER_URL", "http://api.test");
        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config, ClientConfig::new("http://api.test"));

        std::env::set_var("DYNREST_TOKEN", "user");
        std::env::set_var("DYNREST_SERVICE_TOKEN", "svc");
        std::env::set_var("DYNREST_STORAGE_KEY", "my_token");
        std::env::set_var("DYNREST_LOGIN_URL", "/login");
        std::env::set_var("DYNREST_HOME_PATH", "/app");
        let config = ClientConfig::from_env().unwrap();
        assert_eq!(
            config,
            ClientConfig::new("http://api.test")
                .with_token("user")
                .with_service_token("svc")
                .with_storage_key("my_token")
                .with_login_url("/login")
                .with_home_path("/app")
        );

        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn empty_server_url_is_a_configuration_error() {
        let err = ClientConfig::new("  ").base_url().unwrap_err();
        assert!(matches!(err, DynRestError::Configuration(_)));
    }
}
