//! async-select - a stateful select component with local options and
//! paginated remote search.
//!
//! The [`AsyncSelect`] component is synchronous: its event methods mutate
//! state and return [`Effect`]s. [`SelectRuntime`] executes those effects on
//! tokio against a [`RemoteSource`] such as [`HttpRemoteSource`] and feeds the
//! results back.

pub mod auth;
pub mod component;
pub mod config;
pub mod error;
pub mod i18n;
pub mod logging;
pub mod options;
pub mod remote;
pub mod selection;
pub mod tasks;

pub use auth::{InternalAuthenticator, InternalRequest, InternalSigner};
pub use component::AsyncSelect;
pub use config::{ImageSize, RemoteConfig, SelectConfig, Settings};
pub use error::{AppError, Result};
pub use i18n::{MessageKey, TextDirection};
pub use options::{normalize, FieldConfig, OptionRecord, OptionStore, RawOptions};
pub use remote::{
    Effect, HttpRemoteSource, RemoteError, RemotePage, RemoteRequest, RemoteSource, SearchPhase,
    SearchState,
};
pub use selection::{SelectionChange, SelectionManager, SelectionMode};
pub use tasks::{RemoteMessage, SelectRuntime, TaskSpawner};
