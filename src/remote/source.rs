//! The remote source seam.

use std::future::Future;

use super::error::Result;
use super::types::{RemotePage, RemoteRequest, SelectedRequest};

/// Something that can answer option searches.
///
/// Implemented by [`HttpRemoteSource`](super::HttpRemoteSource) for real
/// endpoints; tests substitute in-memory sources.
pub trait RemoteSource: Send + Sync + 'static {
    /// Fetch one page of options for a search request.
    fn fetch_page(&self, request: &RemoteRequest) -> impl Future<Output = Result<RemotePage>> + Send;

    /// Fetch the records for already selected values.
    fn fetch_selected(
        &self,
        request: &SelectedRequest,
    ) -> impl Future<Output = Result<RemotePage>> + Send;
}
