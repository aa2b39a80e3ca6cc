//! Option normalization.
//!
//! Converts heterogeneous raw option input (lists of records, lists of
//! primitives, keyed maps) into canonical [`OptionRecord`]s. Records without a
//! resolvable value or label are skipped silently.

use serde_json::{Map, Value};

use super::record::{OptionRecord, OptionTable};

/// Candidate fields for the value when no value field is configured.
const VALUE_FIELDS: &[&str] = &["id", "value"];

/// Candidate fields for the label when no label field is configured.
const LABEL_FIELDS: &[&str] = &["title", "name", "label", "text"];

/// Candidate fields for the image when image auto-detection is requested.
const IMAGE_FIELDS: &[&str] = &["image", "avatar", "img", "photo", "picture", "thumbnail"];

/// Candidate fields for the group.
const GROUP_FIELDS: &[&str] = &["group", "optgroup"];

/// Raw option input as supplied by the caller or a remote payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RawOptions {
    /// An ordered list. Primitive items use their index as the value.
    List(Vec<Value>),
    /// A keyed map. Primitive items use their key as the value.
    Keyed(Vec<(String, Value)>),
    /// No options.
    #[default]
    Empty,
}

impl RawOptions {
    /// Build raw options from an arbitrary JSON value.
    ///
    /// Arrays become lists, objects become keyed maps, `null` is empty and any
    /// other scalar is treated as a one-element list.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => RawOptions::Empty,
            Value::Array(items) => RawOptions::List(items),
            Value::Object(map) => RawOptions::Keyed(map.into_iter().collect()),
            scalar => RawOptions::List(vec![scalar]),
        }
    }

    /// Build a keyed map from `(value, label)` pairs.
    pub fn pairs<K, L>(pairs: impl IntoIterator<Item = (K, L)>) -> Self
    where
        K: Into<String>,
        L: Into<String>,
    {
        RawOptions::Keyed(
            pairs
                .into_iter()
                .map(|(k, l)| (k.into(), Value::String(l.into())))
                .collect(),
        )
    }

    /// Number of raw items (before normalization).
    pub fn len(&self) -> usize {
        match self {
            RawOptions::List(items) => items.len(),
            RawOptions::Keyed(items) => items.len(),
            RawOptions::Empty => 0,
        }
    }

    /// Check if there are no raw items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate `(enumeration key, item)` pairs in input order.
    fn entries(&self) -> Box<dyn Iterator<Item = (String, &Value)> + '_> {
        match self {
            RawOptions::List(items) => {
                Box::new(items.iter().enumerate().map(|(i, v)| (i.to_string(), v)))
            }
            RawOptions::Keyed(items) => Box::new(items.iter().map(|(k, v)| (k.clone(), v))),
            RawOptions::Empty => Box::new(std::iter::empty()),
        }
    }
}

impl From<Value> for RawOptions {
    fn from(value: Value) -> Self {
        RawOptions::from_json(value)
    }
}

impl From<Vec<OptionRecord>> for RawOptions {
    fn from(records: Vec<OptionRecord>) -> Self {
        RawOptions::List(
            records
                .into_iter()
                .filter_map(|r| serde_json::to_value(r).ok())
                .collect(),
        )
    }
}

/// Caller-configured field names used during normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldConfig {
    /// Field holding the value. `None` auto-detects `id`, then `value`.
    pub value_field: Option<String>,
    /// Field holding the label. `None` auto-detects `title`, `name`, `label`, `text`.
    pub label_field: Option<String>,
    /// Image field. `None` disables images, `Some("")` auto-detects.
    pub image_field: Option<String>,
}

impl FieldConfig {
    /// Field config that auto-detects value and label and ignores images.
    pub fn auto() -> Self {
        Self::default()
    }

    /// Use a specific value field.
    pub fn with_value_field(mut self, field: impl Into<String>) -> Self {
        self.value_field = non_empty(field.into());
        self
    }

    /// Use a specific label field.
    pub fn with_label_field(mut self, field: impl Into<String>) -> Self {
        self.label_field = non_empty(field.into());
        self
    }

    /// Enable images; an empty field name auto-detects.
    pub fn with_image_field(mut self, field: impl Into<String>) -> Self {
        self.image_field = Some(field.into());
        self
    }
}

fn non_empty(field: String) -> Option<String> {
    if field.is_empty() {
        None
    } else {
        Some(field)
    }
}

/// Normalize raw options into an ordered table keyed by value.
pub fn normalize(raw: &RawOptions, fields: &FieldConfig) -> OptionTable {
    let mut table = OptionTable::with_capacity(raw.len());

    for (key, item) in raw.entries() {
        let record = match item {
            Value::Object(map) => normalize_record(map, fields),
            Value::String(_) | Value::Number(_) => scalar_to_string(item)
                .map(|label| OptionRecord::new(key.clone(), label)),
            _ => None,
        };

        match record {
            Some(record) => {
                table.insert(record.value.clone(), record);
            }
            None => tracing::trace!(key = %key, "Skipping option without value or label"),
        }
    }

    table
}

fn normalize_record(map: &Map<String, Value>, fields: &FieldConfig) -> Option<OptionRecord> {
    let value = match &fields.value_field {
        Some(field) => lookup(map, field),
        None => first_present(map, VALUE_FIELDS),
    }?;
    let label = match &fields.label_field {
        Some(field) => lookup(map, field),
        None => first_present(map, LABEL_FIELDS),
    }?;

    let value = identity_key(value)?;
    let label = scalar_to_string(label)?;

    let image = match fields.image_field.as_deref() {
        None => None,
        Some("") => first_present(map, IMAGE_FIELDS),
        Some(field) => lookup(map, field),
    }
    .and_then(scalar_to_string);

    let group = first_present(map, GROUP_FIELDS).and_then(scalar_to_string);
    let disabled = map.get("disabled").map(is_truthy).unwrap_or(false);

    Some(OptionRecord {
        value,
        label,
        image,
        disabled,
        group,
    })
}

/// Look up a non-null field, trying the exact key before a dotted path.
fn lookup<'a>(map: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    if let Some(value) = map.get(path) {
        return (!value.is_null()).then_some(value);
    }
    if !path.contains('.') {
        return None;
    }

    let mut segments = path.split('.');
    let mut current = map.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(inner) => inner.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    (!current.is_null()).then_some(current)
}

fn first_present<'a>(map: &'a Map<String, Value>, fields: &[&str]) -> Option<&'a Value> {
    fields.iter().find_map(|field| lookup(map, field))
}

/// Convert a raw value into its canonical identity key.
///
/// Returns `None` for `null` and composite values (lists, objects), which have
/// no stable string identity.
pub fn identity_key(value: &Value) -> Option<String> {
    scalar_to_string(value)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(number_to_string(n)),
        Value::Bool(true) => Some("1".to_string()),
        Value::Bool(false) => Some(String::new()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn number_to_string(n: &serde_json::Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
            format!("{}", f as i64)
        }
        _ => n.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !(s.is_empty() || s == "0"),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
