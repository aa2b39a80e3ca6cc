//! Per-component configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ConfigError, Result, Settings};
use crate::options::{FieldConfig, RawOptions};

/// Size of option images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSize {
    Sm,
    #[default]
    Md,
    Lg,
    Xl,
}

impl ImageSize {
    /// Parse a size name; anything unrecognized is `Md`.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "sm" => ImageSize::Sm,
            "lg" => ImageSize::Lg,
            "xl" => ImageSize::Xl,
            _ => ImageSize::Md,
        }
    }

    /// Utility classes for the image element.
    pub fn css_class(self) -> &'static str {
        match self {
            ImageSize::Sm => "h-4 w-4",
            ImageSize::Md => "h-6 w-6",
            ImageSize::Lg => "h-8 w-8",
            ImageSize::Xl => "h-10 w-10",
        }
    }

    /// Edge length in pixels.
    pub fn pixels(self) -> u32 {
        match self {
            ImageSize::Sm => 16,
            ImageSize::Md => 24,
            ImageSize::Lg => 32,
            ImageSize::Xl => 40,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ImageSize::Sm => "sm",
            ImageSize::Md => "md",
            ImageSize::Lg => "lg",
            ImageSize::Xl => "xl",
        }
    }
}

impl FromStr for ImageSize {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(ImageSize::parse(s))
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings for remote option loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Search endpoint. `None` means options are local only.
    pub endpoint: Option<String>,
    /// Endpoint returning records for selected values.
    pub selected_endpoint: Option<String>,
    pub search_param: String,
    pub selected_param: String,
    pub page_param: String,
    pub per_page_param: Option<String>,
    pub per_page: u32,
    /// Minimum characters before a search is sent.
    pub min_search_length: usize,
    /// Quiet period before a search is sent.
    pub debounce: Duration,
    /// Load the default set on mount and on an empty search.
    pub autoload: bool,
    /// Static parameters sent with every request.
    pub extra_params: IndexMap<String, String>,
}

impl RemoteConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            endpoint: None,
            selected_endpoint: None,
            search_param: settings.search_param.clone(),
            selected_param: settings.selected_param.clone(),
            page_param: settings.page_param.clone(),
            per_page_param: Some(settings.per_page_param.clone()).filter(|p| !p.is_empty()),
            per_page: settings.per_page,
            min_search_length: settings.min_search_length,
            debounce: Duration::from_millis(settings.search_delay_ms),
            autoload: settings.autoload,
            extra_params: IndexMap::new(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Configuration of one select component.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectConfig {
    /// Initial value: a scalar, a list, or null.
    pub value: Value,
    /// Local options.
    pub options: RawOptions,
    pub remote: RemoteConfig,
    pub multiple: bool,
    pub fields: FieldConfig,
    pub image_size: ImageSize,
    /// Allow creating values that are not in any option table.
    pub tags: bool,
    /// Selection limit in multiple mode; 0 is unlimited.
    pub max_selections: usize,
    /// Close the dropdown after selecting. Defaults to `!multiple`.
    pub close_on_select: Option<bool>,
    pub clearable: bool,
    /// Placeholder override; the settings placeholder is used otherwise.
    pub placeholder: Option<String>,
    pub locale: String,
    /// Validation message supplied by the host form.
    pub error: Option<String>,
    pub class_prefix: String,
    default_placeholder: String,
}

impl Default for SelectConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl SelectConfig {
    /// Start from package defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from loaded settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            value: Value::Null,
            options: RawOptions::Empty,
            remote: RemoteConfig::from_settings(settings),
            multiple: settings.multiple,
            fields: FieldConfig::auto(),
            image_size: ImageSize::default(),
            tags: false,
            max_selections: 0,
            close_on_select: None,
            clearable: true,
            placeholder: None,
            locale: settings.locale.clone(),
            error: None,
            class_prefix: settings.class_prefix.clone(),
            default_placeholder: settings.placeholder.clone(),
        }
    }

    pub fn with_options(mut self, options: impl Into<RawOptions>) -> Self {
        self.options = options.into();
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = value;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.remote.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_selected_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.remote.selected_endpoint = Some(endpoint.into());
        self
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn with_max_selections(mut self, max: usize) -> Self {
        self.max_selections = max;
        self
    }

    /// Enable tag creation. Tags only apply in multiple mode.
    pub fn with_tags(mut self) -> Self {
        self.tags = true;
        self
    }

    pub fn with_autoload(mut self, autoload: bool) -> Self {
        self.remote.autoload = autoload;
        self
    }

    pub fn with_min_search_length(mut self, length: usize) -> Self {
        self.remote.min_search_length = length;
        self
    }

    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.remote.debounce = delay;
        self
    }

    pub fn with_search_param(mut self, param: impl Into<String>) -> Self {
        self.remote.search_param = param.into();
        self
    }

    pub fn with_selected_param(mut self, param: impl Into<String>) -> Self {
        self.remote.selected_param = param.into();
        self
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.remote.per_page = per_page;
        self
    }

    pub fn with_extra_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.remote.extra_params.insert(key.into(), value.into());
        self
    }

    pub fn with_fields(mut self, fields: FieldConfig) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_image_size(mut self, size: ImageSize) -> Self {
        self.image_size = size;
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn close_on_select(mut self, close: bool) -> Self {
        self.close_on_select = Some(close);
        self
    }

    pub fn clearable(mut self, clearable: bool) -> Self {
        self.clearable = clearable;
        self
    }

    /// Prefix for the CSS classes of rendered elements.
    pub fn with_class_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.class_prefix = prefix.into();
        self
    }

    /// Placeholder to show when nothing is selected.
    pub fn effective_placeholder(&self) -> &str {
        self.placeholder
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.default_placeholder)
    }

    /// Whether selecting an option should close the dropdown.
    pub fn should_close_on_select(&self) -> bool {
        self.close_on_select.unwrap_or(!self.multiple)
    }

    /// Validate the configuration before building a component.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError::ValidationError` describing the first problem.
    pub fn validate(&self) -> Result<()> {
        for (name, endpoint) in [
            ("endpoint", &self.remote.endpoint),
            ("selected endpoint", &self.remote.selected_endpoint),
        ] {
            let Some(endpoint) = endpoint else {
                continue;
            };
            if endpoint.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{} cannot be empty",
                    name
                )));
            }
            if !endpoint.starts_with("https://")
                && !endpoint.starts_with("http://")
                && !endpoint.starts_with('/')
            {
                return Err(ConfigError::ValidationError(format!(
                    "{} '{}' must be an http(s) URL or start with /",
                    name, endpoint
                )));
            }
        }

        if self.remote.per_page == 0 {
            return Err(ConfigError::ValidationError(
                "per_page must be greater than zero".to_string(),
            ));
        }

        for (name, param) in [
            ("search parameter", &self.remote.search_param),
            ("selected parameter", &self.remote.selected_param),
            ("page parameter", &self.remote.page_param),
        ] {
            if param.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{} name cannot be empty",
                    name
                )));
            }
        }

        Ok(())
    }
}
