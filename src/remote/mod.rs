//! Remote option loading.
//!
//! This module contains the search controller that decides when to query a
//! remote endpoint, the [`RemoteSource`] seam, and its HTTP implementation.

mod client;
mod controller;
mod error;
mod source;
mod types;

pub use client::HttpRemoteSource;
pub use controller::{Effect, SearchController, SearchPhase, SearchState};
pub use error::{RemoteError, Result};
pub use source::RemoteSource;
pub use types::{RemotePage, RemoteRequest, RequestToken, SelectedRequest};
