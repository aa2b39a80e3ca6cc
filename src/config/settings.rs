//! Package-wide settings.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{config_path, ConfigError, Result, ENV_PREFIX};
use crate::auth::DEFAULT_SKEW_SECS;

/// Defaults shared by every select component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Placeholder shown when nothing is selected.
    pub placeholder: String,
    /// Minimum characters before a remote search is sent.
    pub min_search_length: usize,
    /// Debounce delay for remote searches, in milliseconds.
    pub search_delay_ms: u64,
    /// Query parameter carrying the search string.
    pub search_param: String,
    /// Query parameter carrying selected values on hydration requests.
    pub selected_param: String,
    /// Query parameter carrying the page number.
    pub page_param: String,
    /// Query parameter carrying the page size; empty disables it.
    pub per_page_param: String,
    /// Page size for remote searches.
    pub per_page: u32,
    /// Load the default remote set without typed input.
    pub autoload: bool,
    /// Default selection mode.
    pub multiple: bool,
    /// CSS class prefix for rendered markup.
    pub class_prefix: String,
    /// Locale for messages and text direction.
    pub locale: String,
    /// Base URL for root-relative endpoints.
    pub base_url: Option<String>,
    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
    /// Internal request authentication.
    pub internal: InternalSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            placeholder: "Select an option".to_string(),
            min_search_length: 2,
            search_delay_ms: 300,
            search_param: "search".to_string(),
            selected_param: "selected".to_string(),
            page_param: "page".to_string(),
            per_page_param: "per_page".to_string(),
            per_page: 20,
            autoload: false,
            multiple: false,
            class_prefix: "las-".to_string(),
            locale: "en".to_string(),
            base_url: None,
            timeout_secs: 30,
            internal: InternalSettings::default(),
        }
    }
}

/// Settings for the `X-Internal-User` header.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InternalSettings {
    /// Shared HMAC secret. Signing and verification are disabled without it.
    pub secret: Option<String>,
    /// Allowed clock skew for the issued-at claim, in seconds.
    pub skew_secs: u64,
}

impl Default for InternalSettings {
    fn default() -> Self {
        Self {
            secret: None,
            skew_secs: DEFAULT_SKEW_SECS,
        }
    }
}

impl std::fmt::Debug for InternalSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InternalSettings")
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field("skew_secs", &self.skew_secs)
            .finish()
    }
}

impl Settings {
    /// Load settings from the default config file and the environment.
    ///
    /// A missing config file is not an error; defaults are used instead.
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        let mut settings = if path.exists() {
            Self::load_from(&path)?
        } else {
            debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };
        settings.apply_env_from(std::env::vars())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file without environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&contents)?;
        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Apply `ASYNC_SELECT_*` overrides from the given variables.
    ///
    /// Unknown variables with the prefix are ignored.
    pub fn apply_env_from<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in vars {
            let Some(name) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value: String = value.into();
            let invalid = || ConfigError::InvalidEnv {
                key: key.as_ref().to_string(),
                value: value.clone(),
            };

            match name {
                "PLACEHOLDER" => self.placeholder = value.clone(),
                "MIN_SEARCH_LENGTH" => self.min_search_length = value.parse().map_err(|_| invalid())?,
                "SEARCH_DELAY_MS" => self.search_delay_ms = value.parse().map_err(|_| invalid())?,
                "SEARCH_PARAM" => self.search_param = value.clone(),
                "SELECTED_PARAM" => self.selected_param = value.clone(),
                "PAGE_PARAM" => self.page_param = value.clone(),
                "PER_PAGE_PARAM" => self.per_page_param = value.clone(),
                "PER_PAGE" => self.per_page = value.parse().map_err(|_| invalid())?,
                "AUTOLOAD" => self.autoload = parse_bool(&value).ok_or_else(invalid)?,
                "MULTIPLE" => self.multiple = parse_bool(&value).ok_or_else(invalid)?,
                "CLASS_PREFIX" => self.class_prefix = value.clone(),
                "LOCALE" => self.locale = value.clone(),
                "BASE_URL" => self.base_url = Some(value.clone()).filter(|v| !v.is_empty()),
                "TIMEOUT_SECS" => self.timeout_secs = value.parse().map_err(|_| invalid())?,
                "INTERNAL_SECRET" => {
                    self.internal.secret = Some(value.clone()).filter(|v| !v.is_empty())
                }
                "INTERNAL_SKEW_SECS" => {
                    self.internal.skew_secs = value.parse().map_err(|_| invalid())?
                }
                _ => continue,
            }
            debug!("Applied environment override {}", key.as_ref());
        }
        Ok(())
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<()> {
        if self.per_page == 0 {
            return Err(ConfigError::ValidationError(
                "per_page must be greater than zero".to_string(),
            ));
        }

        for (name, value) in [
            ("search_param", &self.search_param),
            ("selected_param", &self.selected_param),
            ("page_param", &self.page_param),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{} cannot be empty",
                    name
                )));
            }
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }

        if let Some(url) = &self.base_url {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(ConfigError::ValidationError(format!(
                    "base_url '{}' must start with http:// or https://",
                    url
                )));
            }
        }

        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.placeholder, "Select an option");
        assert_eq!(settings.min_search_length, 2);
        assert_eq!(settings.search_delay_ms, 300);
        assert_eq!(settings.search_param, "search");
        assert_eq!(settings.selected_param, "selected");
        assert_eq!(settings.per_page, 20);
        assert!(!settings.autoload);
        assert!(!settings.multiple);
        assert_eq!(settings.class_prefix, "las-");
        assert_eq!(settings.internal.skew_secs, 60);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_from_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "min_search_length = 3\nautoload = true\n\n[internal]\nsecret = \"abc\""
        )
        .unwrap();

        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.min_search_length, 3);
        assert!(settings.autoload);
        assert_eq!(settings.internal.secret.as_deref(), Some("abc"));
        assert_eq!(settings.internal.skew_secs, 60);
        assert_eq!(settings.search_param, "search");
    }

    #[test]
    fn test_load_from_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "per_page = \"many\"").unwrap();
        assert!(matches!(
            Settings::load_from(file.path()),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Settings::load_from(&dir.path().join("nope.toml")),
            Err(ConfigError::ReadError(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings
            .apply_env_from([
                ("ASYNC_SELECT_AUTOLOAD", "true"),
                ("ASYNC_SELECT_PER_PAGE", "50"),
                ("ASYNC_SELECT_SEARCH_PARAM", "q"),
                ("ASYNC_SELECT_UNKNOWN", "x"),
                ("PATH", "/usr/bin"),
            ])
            .unwrap();
        assert!(settings.autoload);
        assert_eq!(settings.per_page, 50);
        assert_eq!(settings.search_param, "q");
    }

    #[test]
    fn test_env_override_invalid_number() {
        let mut settings = Settings::default();
        let err = settings
            .apply_env_from([("ASYNC_SELECT_PER_PAGE", "lots")])
            .unwrap_err();
        assert!(err.to_string().contains("ASYNC_SELECT_PER_PAGE"));
    }

    #[test]
    #[serial]
    fn test_env_from_process() {
        std::env::set_var("ASYNC_SELECT_MIN_SEARCH_LENGTH", "4");
        let mut settings = Settings::default();
        let result = settings.apply_env_from(std::env::vars());
        std::env::remove_var("ASYNC_SELECT_MIN_SEARCH_LENGTH");
        result.unwrap();
        assert_eq!(settings.min_search_length, 4);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let settings = Settings {
            per_page: 0,
            ..Settings::default()
        };
        assert!(settings.validate().unwrap_err().to_string().contains("per_page"));

        let settings = Settings {
            search_param: " ".to_string(),
            ..Settings::default()
        };
        assert!(settings
            .validate()
            .unwrap_err()
            .to_string()
            .contains("search_param cannot be empty"));

        let settings = Settings {
            base_url: Some("example.com".to_string()),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_settings_roundtrip_toml() {
        let settings = Settings::default();
        let toml_str = toml::to_string(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml_str).unwrap();
        assert_eq!(settings, parsed);
    }

    #[test]
    fn test_internal_debug_redacts_secret() {
        let internal = InternalSettings {
            secret: Some("hunter2".to_string()),
            skew_secs: 60,
        };
        assert!(!format!("{:?}", internal).contains("hunter2"));
    }
}
