use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;
use url::Url;

/// Where the developer portal's account services live.
pub const DEFAULT_BASE_URL: &str = "https://developer.apple.com/services-account/QH65B2/";

/// The number of keys requested per page when listing.
pub const DEFAULT_PAGE_SIZE: u32 = 40;

/// Optional configuration file, relative to the working directory.
const CONFIG_FILE: &str = "portalkeys";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    #[error("invalid base URL {url:?}: {source}")]
    BaseUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("page_size must be at least 1")]
    PageSize,
}

/// Settings for talking to the portal.
#[derive(Debug, Clone, Deserialize)]
pub struct PortalConfig {
    pub base_url: String,
    /// The team all key operations are scoped to.
    pub team_id: String,
    /// An already-established session, sent verbatim as the `Cookie` header.
    #[serde(default)]
    pub session: Option<String>,
    pub page_size: u32,
    pub log_level: String,
}

impl PortalConfig {
    /// Loads configuration from `portalkeys.toml` (if present) and `PORTAL_*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// As with `load`, but reading variables from `environment` in place of the process's.
    pub fn load_from(environment: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_default("page_size", i64::from(DEFAULT_PAGE_SIZE))?
            .set_default("log_level", "info")?
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(config::Environment::with_prefix("PORTAL").source(environment))
            .build()?;

        let mut portal: PortalConfig = settings.try_deserialize()?;
        portal.base_url = normalize_base_url(&portal.base_url)?.to_string();
        if portal.page_size == 0 {
            return Err(ConfigError::PageSize);
        }

        Ok(portal)
    }
}

/// Parses a base URL, ensuring it ends with `/`.
///
/// `Url::join` replaces the final path segment otherwise,
/// so `.../QH65B2` + `account/...` would lose `QH65B2`.
pub fn normalize_base_url(raw: &str) -> Result<Url, ConfigError> {
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };

    Url::parse(&with_slash).map_err(|source| ConfigError::BaseUrl {
        url: raw.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn environment(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_defaults() {
        let config = PortalConfig::load_from(environment(&[("PORTAL_TEAM_ID", "TEAM123")])).unwrap();

        assert_eq!(config.team_id, "TEAM123");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.log_level, "info");
        assert!(config.session.is_none());
    }

    #[test]
    fn test_team_id_is_required() {
        let result = PortalConfig::load_from(environment(&[]));
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_overrides() {
        let config = PortalConfig::load_from(environment(&[
            ("PORTAL_TEAM_ID", "TEAM123"),
            ("PORTAL_BASE_URL", "http://localhost:8080/services"),
            ("PORTAL_SESSION", "myacinfo=abc"),
            ("PORTAL_PAGE_SIZE", "5"),
        ]))
        .unwrap();

        assert_eq!(config.base_url, "http://localhost:8080/services/");
        assert_eq!(config.session.as_deref(), Some("myacinfo=abc"));
        assert_eq!(config.page_size, 5);
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let result = PortalConfig::load_from(environment(&[
            ("PORTAL_TEAM_ID", "TEAM123"),
            ("PORTAL_PAGE_SIZE", "0"),
        ]));
        assert!(matches!(result, Err(ConfigError::PageSize)));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            normalize_base_url("not a url"),
            Err(ConfigError::BaseUrl { .. })
        ));
    }
}
