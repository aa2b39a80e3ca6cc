//! Selection management.
//!
//! Owns the selected value(s) of a select and applies the selection policies:
//! disabled options cannot be picked, multiple mode toggles and respects the
//! selection limit, single mode replaces.

use serde_json::Value;
use tracing::trace;

use crate::options::{identity_key, OptionRecord, OptionStore};

/// Whether one or many values can be selected. Fixed for the lifetime of a select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// At most one value.
    #[default]
    Single,
    /// An ordered set of unique values.
    Multiple,
}

/// Outcome of a selection operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionChange {
    /// Whether the selected values changed.
    pub changed: bool,
    /// Whether the caller should clear its search string.
    pub clear_search: bool,
}

impl SelectionChange {
    /// Nothing happened.
    pub const IGNORED: Self = Self {
        changed: false,
        clear_search: false,
    };

    /// The selection changed.
    pub const UPDATED: Self = Self {
        changed: true,
        clear_search: false,
    };

    /// The selection changed and the search string should be cleared.
    pub const UPDATED_CLEAR_SEARCH: Self = Self {
        changed: true,
        clear_search: true,
    };

    /// The selection is unchanged but the search string should be cleared.
    pub const CLEAR_SEARCH: Self = Self {
        changed: false,
        clear_search: true,
    };

    fn updated_if(changed: bool) -> Self {
        if changed {
            Self::UPDATED
        } else {
            Self::IGNORED
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Selection {
    Single(Option<String>),
    Multiple(Vec<String>),
}

/// Selected values and the policies that govern them.
#[derive(Debug, Clone)]
pub struct SelectionManager {
    selection: Selection,
    /// Maximum number of values in multiple mode (0 = unlimited).
    max_selections: usize,
    /// Whether free-entry tags can be created.
    tags: bool,
}

impl SelectionManager {
    /// Create an empty selection.
    pub fn new(mode: SelectionMode, max_selections: usize, tags: bool) -> Self {
        let selection = match mode {
            SelectionMode::Single => Selection::Single(None),
            SelectionMode::Multiple => Selection::Multiple(Vec::new()),
        };
        Self {
            selection,
            max_selections,
            tags,
        }
    }

    /// The selection mode.
    pub fn mode(&self) -> SelectionMode {
        match self.selection {
            Selection::Single(_) => SelectionMode::Single,
            Selection::Multiple(_) => SelectionMode::Multiple,
        }
    }

    /// Check if multiple values can be selected.
    pub fn is_multiple(&self) -> bool {
        self.mode() == SelectionMode::Multiple
    }

    /// The selection limit (0 = unlimited).
    pub fn max_selections(&self) -> usize {
        self.max_selections
    }

    /// Check if tag creation is enabled.
    pub fn tags_enabled(&self) -> bool {
        self.tags
    }

    /// Replace the selection with an externally supplied value.
    ///
    /// Multiple mode accepts an array or a single scalar; entries without a
    /// string identity are dropped, duplicates removed and the result truncated
    /// to the selection limit. Single mode takes the first element of an array;
    /// `null` and `""` mean no selection.
    pub fn set_value(&mut self, value: &Value) {
        match &mut self.selection {
            Selection::Multiple(values) => {
                let items: Vec<&Value> = match value {
                    Value::Null => Vec::new(),
                    Value::Array(items) => items.iter().collect(),
                    other => vec![other],
                };
                values.clear();
                for key in items.into_iter().filter_map(identity_key) {
                    if !values.contains(&key) {
                        values.push(key);
                    }
                }
                if self.max_selections > 0 && values.len() > self.max_selections {
                    trace!(limit = self.max_selections, "Truncating selection to limit");
                    values.truncate(self.max_selections);
                }
            }
            Selection::Single(current) => {
                let first = match value {
                    Value::Array(items) => items.first().unwrap_or(&Value::Null),
                    other => other,
                };
                *current = identity_key(first).filter(|key| !key.is_empty());
            }
        }
    }

    /// The selection as the JSON shape a host form binds to.
    pub fn value(&self) -> Value {
        match &self.selection {
            Selection::Single(Some(v)) => Value::String(v.clone()),
            Selection::Single(None) => Value::Null,
            Selection::Multiple(values) => {
                Value::Array(values.iter().cloned().map(Value::String).collect())
            }
        }
    }

    /// Selected values in selection order.
    pub fn selected_values(&self) -> &[String] {
        match &self.selection {
            Selection::Single(Some(v)) => std::slice::from_ref(v),
            Selection::Single(None) => &[],
            Selection::Multiple(values) => values,
        }
    }

    /// Check if a value is selected.
    pub fn is_selected(&self, value: &str) -> bool {
        self.selected_values().iter().any(|v| v == value)
    }

    /// Check if anything is selected.
    pub fn has_selection(&self) -> bool {
        !self.selected_values().is_empty()
    }

    /// Check if the selection limit has been reached.
    pub fn max_selections_reached(&self) -> bool {
        match &self.selection {
            Selection::Multiple(values) => {
                self.max_selections > 0 && values.len() >= self.max_selections
            }
            Selection::Single(_) => false,
        }
    }

    /// Select a value.
    ///
    /// Disabled values are ignored. In multiple mode an already selected value
    /// is deselected and a new value is ignored at the limit. In single mode
    /// the value replaces the current one and the search should be cleared.
    pub fn select(&mut self, value: &str, store: &OptionStore) -> SelectionChange {
        if value.is_empty() || store.is_disabled(value) {
            trace!(value, "Ignoring selection of disabled or empty value");
            return SelectionChange::IGNORED;
        }

        let at_limit = self.max_selections_reached();
        match &mut self.selection {
            Selection::Multiple(values) => {
                if let Some(pos) = values.iter().position(|v| v == value) {
                    values.remove(pos);
                    SelectionChange::UPDATED
                } else if at_limit {
                    trace!(value, limit = self.max_selections, "Selection limit reached");
                    SelectionChange::IGNORED
                } else {
                    values.push(value.to_string());
                    SelectionChange::UPDATED
                }
            }
            Selection::Single(current) => {
                *current = Some(value.to_string());
                SelectionChange::UPDATED_CLEAR_SEARCH
            }
        }
    }

    /// Toggle a value in multiple mode. Ignored in single mode.
    pub fn toggle(&mut self, value: &str, store: &OptionStore) -> SelectionChange {
        if !self.is_multiple() {
            return SelectionChange::IGNORED;
        }
        self.select(value, store)
    }

    /// Remove a value if it is selected.
    pub fn deselect(&mut self, value: &str) -> SelectionChange {
        match &mut self.selection {
            Selection::Multiple(values) => {
                let before = values.len();
                values.retain(|v| v != value);
                SelectionChange::updated_if(values.len() != before)
            }
            Selection::Single(current) => {
                if current.as_deref() == Some(value) {
                    *current = None;
                    SelectionChange::UPDATED
                } else {
                    SelectionChange::IGNORED
                }
            }
        }
    }

    /// Clear one value (multiple mode) or the whole selection.
    ///
    /// Single mode always clears, regardless of `value`.
    pub fn clear(&mut self, value: Option<&str>) -> SelectionChange {
        if let (true, Some(value)) = (self.is_multiple(), value) {
            return self.deselect(value);
        }
        match &mut self.selection {
            Selection::Multiple(values) => {
                let changed = !values.is_empty();
                values.clear();
                SelectionChange::updated_if(changed)
            }
            Selection::Single(current) => SelectionChange::updated_if(current.take().is_some()),
        }
    }

    /// Remove the most recently added value (multiple mode only).
    pub fn remove_last(&mut self) -> SelectionChange {
        match &mut self.selection {
            Selection::Multiple(values) => SelectionChange::updated_if(values.pop().is_some()),
            Selection::Single(_) => SelectionChange::IGNORED,
        }
    }

    /// Create and select a free-entry tag from `text`.
    ///
    /// Only available in multiple mode with tags enabled. Blank text is
    /// ignored, an already selected tag only clears the search, and nothing
    /// happens at the selection limit.
    pub fn create_tag(&mut self, text: &str, store: &mut OptionStore) -> SelectionChange {
        if !self.tags {
            return SelectionChange::IGNORED;
        }
        let at_limit = self.max_selections_reached();
        let Selection::Multiple(values) = &mut self.selection else {
            return SelectionChange::IGNORED;
        };

        let tag = text.trim();
        if tag.is_empty() {
            return SelectionChange::IGNORED;
        }
        if values.iter().any(|v| v == tag) {
            return SelectionChange::CLEAR_SEARCH;
        }
        if at_limit {
            return SelectionChange::IGNORED;
        }

        store.cache_if_absent(OptionRecord::placeholder_for(tag));
        values.push(tag.to_string());
        trace!(tag, "Created tag");
        SelectionChange::UPDATED_CLEAR_SEARCH
    }

    /// Selected values joined against the option cache.
    ///
    /// Values without a cached record get a synthetic record whose label is
    /// the value itself.
    pub fn selected_options(&self, store: &OptionStore) -> Vec<OptionRecord> {
        self.selected_values()
            .iter()
            .map(|value| {
                store
                    .cache_lookup(value)
                    .cloned()
                    .unwrap_or_else(|| OptionRecord::placeholder_for(value))
            })
            .collect()
    }
}
