//! Option normalization and storage.
//!
//! This module turns caller-supplied and remote option data into canonical
//! records and keeps the tables the select displays from.

mod normalize;
mod record;
mod store;

pub use normalize::{identity_key, normalize, FieldConfig, RawOptions};
pub use record::{merge_into, OptionRecord, OptionTable};
pub use store::{GroupedOptions, OptionSource, OptionStore, UNGROUPED_BUCKET};
