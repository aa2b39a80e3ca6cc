//! Remote search controller.
//!
//! Decides when option requests are issued for a search string, tracks the
//! single outstanding request, and applies responses to the option store.
//! Nothing here performs I/O: operations return [`Effect`]s that the runtime
//! executes, and responses come back through [`SearchController::complete`].

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::types::{RemotePage, RemoteRequest, RequestToken, SelectedRequest};
use crate::config::RemoteConfig;
use crate::options::OptionStore;

/// Side effects requested by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Issue `request` after `delay` unless superseded first.
    Schedule {
        request: RemoteRequest,
        delay: Duration,
    },
    /// Issue `request` now, superseding anything scheduled or in flight.
    Fetch(RemoteRequest),
    /// Abort whatever is scheduled or in flight.
    CancelPending,
    /// Load the records of selected values missing from the cache.
    FetchSelected(SelectedRequest),
}

/// Coarse state of the remote search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchPhase {
    #[default]
    Idle,
    Debouncing,
    Loading,
    Loaded,
    Error,
}

/// Snapshot of the search state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchState {
    pub query: String,
    pub page: u32,
    pub has_more: bool,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// The request occupying the single scheduled-or-in-flight slot.
#[derive(Debug, Clone, Copy)]
struct Outstanding {
    token: RequestToken,
    page: u32,
    replace: bool,
    /// Page counter to restore if a continuation fails.
    previous_page: u32,
    /// False while the request is still waiting out its debounce.
    fired: bool,
}

/// Remote search state machine.
#[derive(Debug)]
pub struct SearchController {
    config: RemoteConfig,
    last_token: u64,
    query: String,
    page: u32,
    has_more: bool,
    loaded: bool,
    error: Option<String>,
    outstanding: Option<Outstanding>,
    requested_selected: HashSet<String>,
}

impl SearchController {
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            config,
            last_token: 0,
            query: String::new(),
            page: 1,
            has_more: false,
            loaded: false,
            error: None,
            outstanding: None,
            requested_selected: HashSet::new(),
        }
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    /// Whether a search endpoint is configured.
    pub fn has_endpoint(&self) -> bool {
        self.config.endpoint.is_some()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.outstanding.is_some_and(|o| o.fired)
    }

    /// Token of the request currently expected to complete.
    pub fn expected_token(&self) -> Option<RequestToken> {
        self.outstanding.map(|o| o.token)
    }

    pub fn phase(&self) -> SearchPhase {
        match self.outstanding {
            Some(o) if !o.fired => SearchPhase::Debouncing,
            Some(_) => SearchPhase::Loading,
            None if self.error.is_some() => SearchPhase::Error,
            None if self.loaded => SearchPhase::Loaded,
            None => SearchPhase::Idle,
        }
    }

    pub fn search_state(&self) -> SearchState {
        SearchState {
            query: self.query.clone(),
            page: self.page,
            has_more: self.has_more,
            is_loading: self.is_loading(),
            error: self.error.clone(),
        }
    }

    /// Replace the search string without evaluating it.
    ///
    /// Used when a single selection clears the search box.
    pub fn reset_query(&mut self) {
        self.query.clear();
    }

    /// Initial load.
    ///
    /// With an endpoint configured, loads page 1 right away when autoload is
    /// on or the initial search string is long enough.
    pub fn mount(&mut self, query: &str) -> Vec<Effect> {
        self.query = query.to_string();
        self.load_first_page()
    }

    /// The endpoint changed; drop remote results and reload if applicable.
    pub fn endpoint_changed(
        &mut self,
        endpoint: Option<String>,
        store: &mut OptionStore,
    ) -> Vec<Effect> {
        info!(endpoint = ?endpoint, "Remote endpoint changed");
        self.config.endpoint = endpoint.filter(|e| !e.trim().is_empty());

        let mut effects = self.cancel();
        store.clear_remote();
        self.page = 1;
        self.has_more = false;
        self.loaded = false;
        self.error = None;

        effects.extend(self.load_first_page());
        effects
    }

    /// The search string changed.
    pub fn search_changed(&mut self, query: &str, store: &mut OptionStore) -> Vec<Effect> {
        self.query = query.to_string();
        if !self.has_endpoint() {
            return Vec::new();
        }

        let length = query.chars().count();
        let long_enough = length >= self.config.min_search_length;

        if query.is_empty() && !self.config.autoload {
            debug!("Search cleared, returning to idle");
            let effects = self.cancel();
            store.clear_remote();
            self.page = 1;
            self.has_more = false;
            self.loaded = false;
            self.error = None;
            return effects;
        }

        if !query.is_empty() && !long_enough && !self.config.autoload {
            debug!(
                "Search {:?} shorter than minimum length {}",
                query, self.config.min_search_length
            );
            return match self.outstanding {
                Some(o) if !o.fired => {
                    self.outstanding = None;
                    vec![Effect::CancelPending]
                }
                _ => Vec::new(),
            };
        }

        let effective = if query.is_empty() || !long_enough {
            String::new()
        } else {
            query.to_string()
        };

        self.page = 1;
        self.has_more = false;
        self.loaded = false;
        store.clear_remote();
        vec![self.issue(effective, 1, true, Some(self.config.debounce))]
    }

    /// Re-issue the current search from page 1.
    pub fn reload(&mut self) -> Vec<Effect> {
        self.load_first_page()
    }

    /// Request the next page if there is one and nothing is outstanding.
    pub fn load_more(&mut self) -> Vec<Effect> {
        if !self.has_endpoint() || !self.has_more || self.outstanding.is_some() || !self.loaded {
            debug!("Load more ignored");
            return Vec::new();
        }
        let Some(query) = self.effective_query() else {
            return Vec::new();
        };

        let next = self.page + 1;
        let effect = self.issue(query, next, false, None);
        self.page = next;
        vec![effect]
    }

    /// A scheduled request fired. Returns false for a superseded token.
    pub fn begin(&mut self, token: RequestToken) -> bool {
        match self.outstanding.as_mut() {
            Some(o) if o.token == token => {
                o.fired = true;
                true
            }
            _ => false,
        }
    }

    /// Apply the result of a request.
    ///
    /// Returns false and leaves every bit of state untouched when `token` is
    /// not the expected one.
    pub fn complete(
        &mut self,
        token: RequestToken,
        result: Result<RemotePage, String>,
        store: &mut OptionStore,
    ) -> bool {
        let outstanding = match self.outstanding {
            Some(o) if o.token == token => o,
            _ => {
                debug!(token = %token, "Discarding stale response");
                return false;
            }
        };
        self.outstanding = None;

        match result {
            Ok(page) => {
                let count = store.ingest_remote_raw(&page.records, outstanding.replace);
                debug!(
                    token = %token,
                    page = outstanding.page,
                    records = count,
                    has_more = page.has_more,
                    "Applied remote page"
                );
                self.page = outstanding.page;
                self.has_more = page.has_more;
                self.loaded = true;
                self.error = None;
            }
            Err(message) => {
                warn!(token = %token, "Remote search failed: {}", message);
                if !outstanding.replace {
                    self.page = outstanding.previous_page;
                }
                self.error = Some(message);
            }
        }
        true
    }

    /// Drop whatever is scheduled or in flight.
    pub fn cancel(&mut self) -> Vec<Effect> {
        match self.outstanding.take() {
            Some(o) => {
                debug!(token = %o.token, "Cancelling outstanding request");
                vec![Effect::CancelPending]
            }
            None => Vec::new(),
        }
    }

    /// Ask the hydration endpoint for selected values missing from the cache.
    ///
    /// Each value is requested at most once per controller.
    pub fn ensure_labels(&mut self, missing: Vec<String>) -> Option<Effect> {
        let endpoint = self.config.selected_endpoint.clone()?;
        let values: Vec<String> = missing
            .into_iter()
            .filter(|v| self.requested_selected.insert(v.clone()))
            .collect();
        if values.is_empty() {
            return None;
        }

        debug!("Requesting labels for {} selected values", values.len());
        Some(Effect::FetchSelected(SelectedRequest {
            endpoint,
            values,
            selected_param: self.config.selected_param.clone(),
            extra_params: self.config.extra_params.clone(),
        }))
    }

    /// Cache records returned by the hydration endpoint.
    pub fn complete_selected(
        &mut self,
        result: Result<RemotePage, String>,
        store: &mut OptionStore,
    ) -> usize {
        match result {
            Ok(page) => store.cache_raw(&page.records),
            Err(message) => {
                warn!("Failed to load selected options: {}", message);
                0
            }
        }
    }

    /// The query to send, or `None` when no request should be made.
    fn effective_query(&self) -> Option<String> {
        if self.query.is_empty() {
            return self.config.autoload.then(String::new);
        }
        if self.query.chars().count() >= self.config.min_search_length {
            Some(self.query.clone())
        } else {
            self.config.autoload.then(String::new)
        }
    }

    fn load_first_page(&mut self) -> Vec<Effect> {
        if !self.has_endpoint() {
            return Vec::new();
        }
        match self.effective_query() {
            Some(query) => {
                self.page = 1;
                vec![self.issue(query, 1, true, None)]
            }
            None => Vec::new(),
        }
    }

    fn issue(
        &mut self,
        query: String,
        page: u32,
        replace: bool,
        delay: Option<Duration>,
    ) -> Effect {
        self.last_token += 1;
        let token = RequestToken(self.last_token);
        let delay = delay.filter(|d| !d.is_zero());

        if let Some(previous) = self.outstanding {
            debug!(superseded = %previous.token, token = %token, "Superseding outstanding request");
        }
        self.outstanding = Some(Outstanding {
            token,
            page,
            replace,
            previous_page: self.page,
            fired: delay.is_none(),
        });
        self.error = None;

        let request = RemoteRequest {
            token,
            endpoint: self.config.endpoint.clone().unwrap_or_default(),
            query,
            page,
            per_page: self.config.per_page,
            replace,
            search_param: self.config.search_param.clone(),
            page_param: self.config.page_param.clone(),
            per_page_param: self.config.per_page_param.clone(),
            extra_params: self.config.extra_params.clone(),
        };

        debug!(token = %token, page, replace, query = %request.query, "Issuing option request");
        match delay {
            Some(delay) => Effect::Schedule { request, delay },
            None => Effect::Fetch(request),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{FieldConfig, OptionSource};
    use serde_json::json;

    fn config() -> RemoteConfig {
        RemoteConfig {
            endpoint: Some("/api/users".to_string()),
            min_search_length: 3,
            debounce: Duration::from_millis(300),
            ..RemoteConfig::default()
        }
    }

    fn store() -> OptionStore {
        OptionStore::new(FieldConfig::auto(), OptionSource::Remote)
    }

    fn page(ids: &[u32], has_more: bool) -> RemotePage {
        RemotePage::new(
            ids.iter()
                .map(|id| json!({"id": id, "name": format!("User {}", id)}))
                .collect(),
            has_more,
        )
    }

    fn request_of(effect: &Effect) -> &RemoteRequest {
        match effect {
            Effect::Schedule { request, .. } | Effect::Fetch(request) => request,
            other => panic!("Expected a request, got {:?}", other),
        }
    }

    #[test]
    fn test_short_query_without_autoload_issues_nothing() {
        let mut controller = SearchController::new(config());
        let mut store = store();

        let effects = controller.search_changed("ab", &mut store);
        assert!(effects.is_empty());
        assert!(!controller.search_state().is_loading);
        assert_eq!(controller.phase(), SearchPhase::Idle);

        let effects = controller.search_changed("abc", &mut store);
        assert_eq!(effects.len(), 1);
        match &effects[0] {
            Effect::Schedule { request, delay } => {
                assert_eq!(*delay, Duration::from_millis(300));
                assert_eq!(request.query, "abc");
                assert_eq!(request.page, 1);
                assert!(request.replace);
                assert!(request
                    .query_pairs()
                    .contains(&("search".to_string(), "abc".to_string())));
            }
            other => panic!("Expected Schedule, got {:?}", other),
        }
        assert_eq!(controller.page(), 1);
        assert_eq!(controller.phase(), SearchPhase::Debouncing);
    }

    #[test]
    fn test_short_query_cancels_pending_schedule() {
        let mut controller = SearchController::new(config());
        let mut store = store();
        controller.search_changed("abc", &mut store);

        let effects = controller.search_changed("ab", &mut store);
        assert_eq!(effects, vec![Effect::CancelPending]);
        assert_eq!(controller.expected_token(), None);
    }

    #[test]
    fn test_new_query_forgets_previous_pagination() {
        let mut controller = SearchController::new(config());
        let mut store = store();
        let token = request_of(&controller.search_changed("abc", &mut store)[0]).token;
        controller.begin(token);
        controller.complete(token, Ok(page(&[1, 2], true)), &mut store);
        assert!(controller.has_more());

        let token = request_of(&controller.search_changed("abcd", &mut store)[0]).token;
        assert!(!controller.search_state().has_more);
        controller.begin(token);
        controller.complete(token, Err("boom".to_string()), &mut store);

        assert!(controller.load_more().is_empty());
        assert_eq!(controller.page(), 1);
        assert!(store.remote().is_empty());
    }

    #[test]
    fn test_empty_query_without_autoload_clears_results() {
        let mut controller = SearchController::new(config());
        let mut store = store();
        let effects = controller.search_changed("abc", &mut store);
        let token = request_of(&effects[0]).token;
        controller.begin(token);
        controller.complete(token, Ok(page(&[1, 2], false)), &mut store);
        assert_eq!(store.remote().len(), 2);

        let effects = controller.search_changed("", &mut store);
        assert!(effects.is_empty());
        assert!(store.remote().is_empty());
        assert_eq!(controller.phase(), SearchPhase::Idle);
        assert_eq!(store.cache_len(), 2);
    }

    #[test]
    fn test_autoload_short_query_loads_default_set() {
        let mut controller = SearchController::new(RemoteConfig {
            autoload: true,
            ..config()
        });
        let mut store = store();

        let effects = controller.search_changed("ab", &mut store);
        assert_eq!(request_of(&effects[0]).query, "");

        let effects = controller.search_changed("", &mut store);
        let request = request_of(&effects[0]);
        assert_eq!(request.query, "");
        assert!(request.query_pairs().iter().all(|(k, _)| k != "search"));
    }

    #[test]
    fn test_mount_with_autoload_fetches_immediately() {
        let mut controller = SearchController::new(RemoteConfig {
            autoload: true,
            ..config()
        });
        let effects = controller.mount("");
        assert!(matches!(&effects[..], [Effect::Fetch(r)] if r.page == 1 && r.query.is_empty()));
        assert_eq!(controller.phase(), SearchPhase::Loading);
    }

    #[test]
    fn test_mount_without_autoload_waits() {
        let mut controller = SearchController::new(config());
        assert!(controller.mount("").is_empty());
        assert!(matches!(&controller.mount("abcd")[..], [Effect::Fetch(r)] if r.query == "abcd"));
    }

    #[test]
    fn test_no_endpoint_is_local_only() {
        let mut controller = SearchController::new(RemoteConfig::default());
        let mut store = store();
        assert!(controller.mount("").is_empty());
        assert!(controller.search_changed("abcdef", &mut store).is_empty());
        assert_eq!(controller.query(), "abcdef");
        assert!(controller.reload().is_empty());
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let mut controller = SearchController::new(config());
        let mut store = store();

        let first = request_of(&controller.search_changed("abc", &mut store)[0]).token;
        let second = request_of(&controller.search_changed("abcd", &mut store)[0]).token;
        assert!(first < second);
        assert!(!controller.begin(first));
        assert!(controller.begin(second));

        assert!(controller.complete(second, Ok(page(&[2], false)), &mut store));
        let before = (store.remote().clone(), controller.search_state());

        assert!(!controller.complete(first, Ok(page(&[1], true)), &mut store));
        assert_eq!((store.remote().clone(), controller.search_state()), before);
        assert!(store.cache_lookup("1").is_none());
    }

    #[test]
    fn test_pagination_appends() {
        let mut controller = SearchController::new(config());
        let mut store = store();

        let token = request_of(&controller.mount("abc")[0]).token;
        controller.complete(token, Ok(page(&[1, 2], true)), &mut store);
        assert!(controller.has_more());

        let effects = controller.load_more();
        let request = request_of(&effects[0]);
        assert_eq!(request.page, 2);
        assert!(!request.replace);
        assert!(controller.load_more().is_empty());

        controller.complete(request.token, Ok(page(&[3], false)), &mut store);
        let values: Vec<_> = store.remote().keys().cloned().collect();
        assert_eq!(values, vec!["1", "2", "3"]);
        assert_eq!(controller.page(), 2);
        assert!(controller.load_more().is_empty());
    }

    #[test]
    fn test_failed_continuation_restores_page_and_keeps_results() {
        let mut controller = SearchController::new(config());
        let mut store = store();

        let token = request_of(&controller.mount("abc")[0]).token;
        controller.complete(token, Ok(page(&[1, 2], true)), &mut store);

        let token = request_of(&controller.load_more()[0]).token;
        assert_eq!(controller.page(), 2);
        controller.complete(token, Err("Connection failed".to_string()), &mut store);

        assert_eq!(controller.page(), 1);
        assert_eq!(controller.error(), Some("Connection failed"));
        assert_eq!(controller.phase(), SearchPhase::Error);
        assert!(!controller.is_loading());
        assert_eq!(store.remote().len(), 2);

        let retry = controller.load_more();
        assert_eq!(request_of(&retry[0]).page, 2);
        assert_eq!(controller.error(), None);
    }

    #[test]
    fn test_reload_resets_to_first_page() {
        let mut controller = SearchController::new(config());
        let mut store = store();
        let token = request_of(&controller.mount("abc")[0]).token;
        controller.complete(token, Ok(page(&[1], true)), &mut store);
        let token = request_of(&controller.load_more()[0]).token;
        controller.complete(token, Ok(page(&[2], true)), &mut store);

        let effects = controller.reload();
        assert!(matches!(&effects[..], [Effect::Fetch(r)] if r.page == 1 && r.replace && r.query == "abc"));
    }

    #[test]
    fn test_endpoint_change_clears_remote_options() {
        let mut controller = SearchController::new(RemoteConfig {
            autoload: true,
            ..config()
        });
        let mut store = store();
        let token = request_of(&controller.mount("")[0]).token;
        controller.complete(token, Ok(page(&[1], false)), &mut store);

        let effects = controller.endpoint_changed(Some("/api/teams".to_string()), &mut store);
        assert!(store.remote().is_empty());
        assert!(matches!(&effects[..], [Effect::Fetch(r)] if r.endpoint == "/api/teams"));

        let effects = controller.endpoint_changed(None, &mut store);
        assert_eq!(effects, vec![Effect::CancelPending]);
        assert!(!controller.has_endpoint());
    }

    #[test]
    fn test_ensure_labels_requests_once() {
        let mut controller = SearchController::new(RemoteConfig {
            selected_endpoint: Some("/api/users/selected".to_string()),
            ..config()
        });

        let effect = controller.ensure_labels(vec!["5".to_string(), "6".to_string()]);
        match effect {
            Some(Effect::FetchSelected(request)) => {
                assert_eq!(request.values, vec!["5", "6"]);
                assert_eq!(request.selected_param, "selected");
            }
            other => panic!("Expected FetchSelected, got {:?}", other),
        }
        assert_eq!(controller.ensure_labels(vec!["5".to_string()]), None);
    }

    #[test]
    fn test_ensure_labels_without_endpoint() {
        let mut controller = SearchController::new(config());
        assert_eq!(controller.ensure_labels(vec!["5".to_string()]), None);
    }

    #[test]
    fn test_complete_selected_fills_cache() {
        let mut controller = SearchController::new(config());
        let mut store = store();
        let cached = controller.complete_selected(Ok(page(&[5], false)), &mut store);
        assert_eq!(cached, 1);
        assert_eq!(store.cache_lookup("5").unwrap().label, "User 5");
        assert_eq!(
            controller.complete_selected(Err("boom".to_string()), &mut store),
            0
        );
    }
}
