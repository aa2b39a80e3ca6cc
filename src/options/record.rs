//! Canonical option record and the ordered table that holds them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// An ordered mapping from identity key to option record.
///
/// Insertion order is display order. Re-inserting an existing key keeps the
/// original position and replaces the record.
pub type OptionTable = IndexMap<String, OptionRecord>;

/// A normalized, selectable option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionRecord {
    /// The stringified identity key.
    pub value: String,
    /// The display label.
    pub label: String,
    /// Optional image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Whether the option can be selected.
    #[serde(default, skip_serializing_if = "is_false")]
    pub disabled: bool,
    /// Optional group name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl OptionRecord {
    /// Create a new enabled, ungrouped option.
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            image: None,
            disabled: false,
            group: None,
        }
    }

    /// Synthetic record used when a selected value has no known label.
    pub fn placeholder_for(value: &str) -> Self {
        Self::new(value, value)
    }

    /// Set the image URL.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Set the group name.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Mark the option as disabled.
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Case-insensitive substring match against the label.
    pub fn label_matches(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        self.label.to_lowercase().contains(&needle.to_lowercase())
    }
}

/// Merge `incoming` into `table`, last write wins per key.
pub fn merge_into(table: &mut OptionTable, incoming: &OptionTable) {
    for (key, record) in incoming {
        table.insert(key.clone(), record.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_serialization_skips_defaults() {
        let record = OptionRecord::new("1", "One");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, serde_json::json!({"value": "1", "label": "One"}));
    }

    #[test]
    fn test_record_serialization_with_extras() {
        let record = OptionRecord::new("1", "One")
            .with_image("https://example.com/1.png")
            .with_group("Numbers")
            .disabled();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["image"], "https://example.com/1.png");
        assert_eq!(json["group"], "Numbers");
        assert_eq!(json["disabled"], true);
    }

    #[test]
    fn test_label_matches_is_case_insensitive() {
        let record = OptionRecord::new("de", "Deutschland");
        assert!(record.label_matches("DEUT"));
        assert!(record.label_matches("land"));
        assert!(record.label_matches(""));
        assert!(!record.label_matches("france"));
    }

    #[test]
    fn test_merge_keeps_position_and_overwrites() {
        let mut table = OptionTable::new();
        table.insert("a".into(), OptionRecord::new("a", "A"));
        table.insert("b".into(), OptionRecord::new("b", "B"));

        let mut incoming = OptionTable::new();
        incoming.insert("a".into(), OptionRecord::new("a", "Alpha"));
        incoming.insert("c".into(), OptionRecord::new("c", "C"));

        merge_into(&mut table, &incoming);

        let keys: Vec<_> = table.keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(table["a"].label, "Alpha");
    }

    #[test]
    fn test_placeholder_uses_value_as_label() {
        let record = OptionRecord::placeholder_for("42");
        assert_eq!(record.value, "42");
        assert_eq!(record.label, "42");
    }
}
