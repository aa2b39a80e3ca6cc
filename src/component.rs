//! The select component.
//!
//! [`AsyncSelect`] owns the option store, the selection and the remote search
//! controller of one select instance. Every event method mutates state
//! synchronously and returns the [`Effect`]s the caller must execute; results
//! of those effects come back through [`AsyncSelect::apply_page`] and
//! [`AsyncSelect::apply_selected`].

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{self, ImageSize, SelectConfig};
use crate::i18n::{self, MessageKey, TextDirection};
use crate::options::{GroupedOptions, OptionRecord, OptionSource, OptionStore, RawOptions};
use crate::remote::{
    Effect, RemoteError, RemotePage, RequestToken, SearchController, SearchPhase, SearchState,
};
use crate::selection::{SelectionChange, SelectionManager, SelectionMode};

/// State of one select instance.
#[derive(Debug)]
pub struct AsyncSelect {
    config: SelectConfig,
    store: OptionStore,
    selection: SelectionManager,
    controller: SearchController,
    error: Option<String>,
    direction: TextDirection,
}

impl AsyncSelect {
    /// Build a component from its configuration.
    ///
    /// Local options and the initial value are applied immediately. Call
    /// [`mount`](Self::mount) to get the initial effects.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError::ValidationError` for an unusable configuration.
    pub fn new(config: SelectConfig) -> config::Result<Self> {
        config.validate()?;

        let source = if config.remote.endpoint.is_some() {
            OptionSource::Remote
        } else {
            OptionSource::Local
        };
        let mode = if config.multiple {
            SelectionMode::Multiple
        } else {
            SelectionMode::Single
        };

        let mut store = OptionStore::new(config.fields.clone(), source);
        store.ingest_local(config.options.clone());

        let mut selection = SelectionManager::new(mode, config.max_selections, config.tags);
        selection.set_value(&config.value);

        let direction = TextDirection::for_locale(&config.locale);
        debug!(
            multiple = config.multiple,
            remote = source == OptionSource::Remote,
            direction = direction.as_str(),
            "Created select"
        );

        Ok(Self {
            controller: SearchController::new(config.remote.clone()),
            error: config.error.clone(),
            config,
            store,
            selection,
            direction,
        })
    }

    /// Initial effects: the autoload request and label hydration.
    pub fn mount(&mut self) -> Vec<Effect> {
        let mut effects = self.controller.mount("");
        effects.extend(self.ensure_labels());
        effects
    }

    /// Rebuild derived tables after state was restored from elsewhere.
    ///
    /// The local options are normalized again and merged into the cache; the
    /// cache itself is kept.
    pub fn hydrate(&mut self) -> Vec<Effect> {
        self.store.rehydrate();
        self.ensure_labels()
    }

    /// Replace the local options.
    pub fn set_options(&mut self, options: impl Into<RawOptions>) -> Vec<Effect> {
        self.store.ingest_local(options.into());
        self.ensure_labels()
    }

    /// Replace the selection with an externally supplied value.
    pub fn set_value(&mut self, value: &Value) -> Vec<Effect> {
        self.selection.set_value(value);
        self.ensure_labels()
    }

    /// Change (or remove) the search endpoint.
    pub fn set_endpoint(&mut self, endpoint: Option<String>) -> Vec<Effect> {
        let endpoint = endpoint.filter(|e| !e.trim().is_empty());
        self.store.set_source(if endpoint.is_some() {
            OptionSource::Remote
        } else {
            OptionSource::Local
        });
        self.controller.endpoint_changed(endpoint, &mut self.store)
    }

    /// The search string changed.
    pub fn set_search(&mut self, query: &str) -> Vec<Effect> {
        self.controller.search_changed(query, &mut self.store)
    }

    /// Select an option (toggles in multiple mode).
    pub fn select_option(&mut self, value: &str) -> Vec<Effect> {
        let change = self.selection.select(value, &self.store);
        self.after_selection(change)
    }

    /// Toggle an option in multiple mode.
    pub fn toggle_option(&mut self, value: &str) -> Vec<Effect> {
        let change = self.selection.toggle(value, &self.store);
        self.after_selection(change)
    }

    /// Turn the current search string into a selected tag.
    pub fn create_tag(&mut self) -> Vec<Effect> {
        let text = self.controller.query().to_string();
        let change = self.selection.create_tag(&text, &mut self.store);
        self.after_selection(change)
    }

    /// Clear one value, or the whole selection with `None`.
    pub fn clear_selection(&mut self, value: Option<&str>) -> Vec<Effect> {
        let change = self.selection.clear(value);
        self.after_selection(change)
    }

    /// Remove the most recently selected value.
    pub fn remove_last_selection(&mut self) -> Vec<Effect> {
        let change = self.selection.remove_last();
        self.after_selection(change)
    }

    /// Reload the current search from page 1.
    pub fn reload(&mut self) -> Vec<Effect> {
        self.controller.reload()
    }

    /// Load the next page of remote results.
    pub fn load_more(&mut self) -> Vec<Effect> {
        self.controller.load_more()
    }

    /// A scheduled request fired. Returns false if it was superseded.
    pub fn begin_request(&mut self, token: RequestToken) -> bool {
        self.controller.begin(token)
    }

    /// Apply a search response.
    ///
    /// Responses for superseded requests are dropped without any change.
    pub fn apply_page(
        &mut self,
        token: RequestToken,
        result: Result<RemotePage, RemoteError>,
    ) -> Vec<Effect> {
        let result = result.map_err(|e| {
            warn!(token = %token, "Option request failed: {}", e);
            e.user_message()
        });
        if self.controller.complete(token, result, &mut self.store) {
            self.ensure_labels()
        } else {
            Vec::new()
        }
    }

    /// Apply a selected-value hydration response.
    pub fn apply_selected(&mut self, result: Result<RemotePage, RemoteError>) -> Vec<Effect> {
        let result = result.map_err(|e| e.to_string());
        let cached = self.controller.complete_selected(result, &mut self.store);
        debug!(cached, "Applied selected options");
        Vec::new()
    }

    /// Set or clear the validation message shown under the select.
    pub fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }

    fn after_selection(&mut self, change: SelectionChange) -> Vec<Effect> {
        if change.clear_search {
            self.controller.reset_query();
        }
        if change.changed {
            self.ensure_labels()
        } else {
            Vec::new()
        }
    }

    fn ensure_labels(&mut self) -> Vec<Effect> {
        let missing = self.store.missing_from_cache(self.selection.selected_values());
        if missing.is_empty() {
            return Vec::new();
        }
        self.controller.ensure_labels(missing).into_iter().collect()
    }

    // Views

    pub fn config(&self) -> &SelectConfig {
        &self.config
    }

    pub fn store(&self) -> &OptionStore {
        &self.store
    }

    /// Options to show in the dropdown.
    pub fn display_options(&self) -> Vec<&OptionRecord> {
        self.store.display_options(self.controller.query())
    }

    pub fn grouped_options(&self) -> GroupedOptions<'_> {
        self.store.grouped_options(self.controller.query())
    }

    pub fn has_groups(&self) -> bool {
        self.store.has_groups(self.controller.query())
    }

    /// Selected records, with the value as label when none is known.
    pub fn selected_options(&self) -> Vec<OptionRecord> {
        self.selection.selected_options(&self.store)
    }

    pub fn selected_values(&self) -> &[String] {
        self.selection.selected_values()
    }

    /// The value as bound by a host form: a string, an array or null.
    pub fn value(&self) -> Value {
        self.selection.value()
    }

    pub fn is_selected(&self, value: &str) -> bool {
        self.selection.is_selected(value)
    }

    pub fn has_selection(&self) -> bool {
        self.selection.has_selection()
    }

    pub fn max_selections_reached(&self) -> bool {
        self.selection.max_selections_reached()
    }

    pub fn is_multiple(&self) -> bool {
        self.selection.is_multiple()
    }

    pub fn search(&self) -> &str {
        self.controller.query()
    }

    pub fn search_state(&self) -> SearchState {
        self.controller.search_state()
    }

    pub fn phase(&self) -> SearchPhase {
        self.controller.phase()
    }

    pub fn text_direction(&self) -> TextDirection {
        self.direction
    }

    pub fn image_size(&self) -> ImageSize {
        self.config.image_size
    }

    /// Edge length of option images, in pixels.
    pub fn image_pixels(&self) -> u32 {
        self.config.image_size.pixels()
    }

    /// CSS class for a rendered element, e.g. `las-dropdown`.
    pub fn class_name(&self, element: &str) -> String {
        format!("{}{}", self.config.class_prefix, element)
    }

    pub fn placeholder(&self) -> &str {
        self.config.effective_placeholder()
    }

    /// The validation message, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The last remote failure, if any.
    pub fn remote_error(&self) -> Option<&str> {
        self.controller.error()
    }

    pub fn message(&self, key: MessageKey) -> &'static str {
        i18n::message(&self.config.locale, key)
    }

    /// Whether the dropdown should close after a selection.
    pub fn should_close_after_select(&self) -> bool {
        self.config.should_close_on_select()
    }

    /// Whether the clear button applies.
    pub fn can_clear(&self) -> bool {
        self.config.clearable && self.has_selection()
    }

    /// Status line for the dropdown, if one should be shown.
    pub fn status_message(&self) -> Option<String> {
        let locale = &self.config.locale;
        let query = self.controller.query();
        let remote = self.controller.has_endpoint();

        match self.phase() {
            SearchPhase::Loading if self.controller.page() > 1 => {
                return Some(i18n::message(locale, MessageKey::LoadingMore).to_string())
            }
            SearchPhase::Loading | SearchPhase::Debouncing if query.is_empty() => {
                return Some(i18n::message(locale, MessageKey::Loading).to_string())
            }
            SearchPhase::Loading | SearchPhase::Debouncing => {
                return Some(i18n::message(locale, MessageKey::Searching).to_string())
            }
            SearchPhase::Error => return self.controller.error().map(str::to_string),
            SearchPhase::Idle | SearchPhase::Loaded => {}
        }

        let min = self.controller.config().min_search_length;
        if remote && !query.is_empty() && query.chars().count() < min {
            return Some(i18n::min_chars(locale, min));
        }

        if !self.display_options().is_empty() {
            return None;
        }

        if !query.is_empty() {
            return Some(format!(
                "{} \"{}\"",
                i18n::message(locale, MessageKey::NoResultsFor),
                query
            ));
        }

        let key = if remote && self.phase() == SearchPhase::Idle {
            MessageKey::TypeToSearch
        } else {
            MessageKey::NoOptions
        };
        Some(i18n::message(locale, key).to_string())
    }
}
