//! Option store.
//!
//! Holds the local option table, the remote (search result) table and a cache
//! of every option record ever seen. The cache only grows: it exists so that a
//! selected value keeps its label after the table that produced it has been
//! replaced.

use indexmap::IndexMap;
use tracing::{debug, trace};

use super::normalize::{normalize, FieldConfig, RawOptions};
use super::record::{merge_into, OptionRecord, OptionTable};

/// Bucket name for options without a group when grouped options exist.
pub const UNGROUPED_BUCKET: &str = "_ungrouped";

/// Where display options come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptionSource {
    /// Local options, filtered client-side by the search string.
    #[default]
    Local,
    /// Remote options, already filtered by the endpoint.
    Remote,
}

/// Display options organized by group.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupedOptions<'a> {
    /// No option carries a group.
    Flat(Vec<&'a OptionRecord>),
    /// Named buckets in first-seen order, ungrouped bucket first.
    Groups(Vec<(String, Vec<&'a OptionRecord>)>),
}

impl<'a> GroupedOptions<'a> {
    /// Total number of options across all buckets.
    pub fn len(&self) -> usize {
        match self {
            GroupedOptions::Flat(items) => items.len(),
            GroupedOptions::Groups(groups) => groups.iter().map(|(_, items)| items.len()).sum(),
        }
    }

    /// Check if there are no options.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Local, remote and cached option tables for one select instance.
#[derive(Debug, Clone, Default)]
pub struct OptionStore {
    /// Field configuration applied on every ingest.
    fields: FieldConfig,
    /// Raw local input, kept for re-hydration.
    raw_local: RawOptions,
    /// Normalized local options.
    local: OptionTable,
    /// Normalized options from the latest remote responses.
    remote: OptionTable,
    /// Every option seen so far.
    cache: OptionTable,
    /// Which table feeds the display.
    source: OptionSource,
}

impl OptionStore {
    /// Create an empty store.
    pub fn new(fields: FieldConfig, source: OptionSource) -> Self {
        Self {
            fields,
            source,
            ..Self::default()
        }
    }

    /// The field configuration used for normalization.
    pub fn fields(&self) -> &FieldConfig {
        &self.fields
    }

    /// Which table feeds the display.
    pub fn source(&self) -> OptionSource {
        self.source
    }

    /// Switch between local and remote display.
    pub fn set_source(&mut self, source: OptionSource) {
        self.source = source;
    }

    /// Replace the local options and merge them into the cache.
    pub fn ingest_local(&mut self, raw: RawOptions) {
        let normalized = normalize(&raw, &self.fields);
        debug!(
            raw = raw.len(),
            normalized = normalized.len(),
            "Ingested local options"
        );
        self.raw_local = raw;
        merge_into(&mut self.cache, &normalized);
        self.local = normalized;
    }

    /// Re-normalize the retained raw local options.
    ///
    /// Used after re-hydration. The cache is merged, never reset.
    pub fn rehydrate(&mut self) {
        let normalized = normalize(&self.raw_local, &self.fields);
        merge_into(&mut self.cache, &normalized);
        self.local = normalized;
    }

    /// Ingest normalized remote records.
    ///
    /// With `replace` the remote table is swapped out, otherwise the records are
    /// merged after the existing ones. The cache is merged either way.
    pub fn ingest_remote(&mut self, records: OptionTable, replace: bool) {
        merge_into(&mut self.cache, &records);
        if replace {
            self.remote = records;
        } else {
            merge_into(&mut self.remote, &records);
        }
        trace!(remote = self.remote.len(), cache = self.cache.len(), replace, "Ingested remote options");
    }

    /// Normalize and ingest a raw remote payload. Returns the number of records kept.
    pub fn ingest_remote_raw(&mut self, raw: &RawOptions, replace: bool) -> usize {
        let records = normalize(raw, &self.fields);
        let count = records.len();
        self.ingest_remote(records, replace);
        count
    }

    /// Merge records into the cache only (selected-value hydration).
    pub fn merge_into_cache(&mut self, records: &OptionTable) {
        merge_into(&mut self.cache, records);
    }

    /// Normalize raw records and merge them into the cache only.
    pub fn cache_raw(&mut self, raw: &RawOptions) -> usize {
        let records = normalize(raw, &self.fields);
        self.merge_into_cache(&records);
        records.len()
    }

    /// Add a record to the cache unless the value is already known.
    pub fn cache_if_absent(&mut self, record: OptionRecord) {
        self.cache.entry(record.value.clone()).or_insert(record);
    }

    /// Drop the remote table. The cache keeps its entries.
    pub fn clear_remote(&mut self) {
        self.remote.clear();
    }

    /// Look up any record ever seen by value.
    pub fn cache_lookup(&self, value: &str) -> Option<&OptionRecord> {
        self.cache.get(value)
    }

    /// Number of cached records.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// The normalized local options.
    pub fn local(&self) -> &OptionTable {
        &self.local
    }

    /// The normalized remote options.
    pub fn remote(&self) -> &OptionTable {
        &self.remote
    }

    /// The raw local input.
    pub fn raw_local(&self) -> &RawOptions {
        &self.raw_local
    }

    /// Values from `values` that have no cached record.
    pub fn missing_from_cache(&self, values: &[String]) -> Vec<String> {
        values
            .iter()
            .filter(|v| !self.cache.contains_key(v.as_str()))
            .cloned()
            .collect()
    }

    /// Check if a value is disabled in the live tables.
    ///
    /// Remote records override local ones with the same value.
    pub fn is_disabled(&self, value: &str) -> bool {
        self.remote
            .get(value)
            .or_else(|| self.local.get(value))
            .map(|record| record.disabled)
            .unwrap_or(false)
    }

    /// Options to display for the current search string.
    ///
    /// Local options are filtered by a case-insensitive label match; remote
    /// options are returned as-is.
    pub fn display_options(&self, search: &str) -> Vec<&OptionRecord> {
        match self.source {
            OptionSource::Remote => self.remote.values().collect(),
            OptionSource::Local => self
                .local
                .values()
                .filter(|record| record.label_matches(search))
                .collect(),
        }
    }

    /// Check if any displayed option carries a group.
    pub fn has_groups(&self, search: &str) -> bool {
        self.display_options(search)
            .iter()
            .any(|record| record.group.is_some())
    }

    /// Display options organized by group.
    pub fn grouped_options(&self, search: &str) -> GroupedOptions<'_> {
        let mut groups: IndexMap<&str, Vec<&OptionRecord>> = IndexMap::new();
        let mut ungrouped = Vec::new();

        for record in self.display_options(search) {
            match record.group.as_deref() {
                Some(group) => groups.entry(group).or_default().push(record),
                None => ungrouped.push(record),
            }
        }

        if groups.is_empty() {
            return GroupedOptions::Flat(ungrouped);
        }

        let mut buckets = Vec::with_capacity(groups.len() + 1);
        if !ungrouped.is_empty() {
            buckets.push((UNGROUPED_BUCKET.to_string(), ungrouped));
        }
        buckets.extend(groups.into_iter().map(|(name, items)| (name.to_string(), items)));
        GroupedOptions::Groups(buckets)
    }
}
