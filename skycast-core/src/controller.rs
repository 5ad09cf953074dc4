//! Search orchestration: the only place that mutates [`AppState`].
//!
//! A search moves the controller `Idle/Success/Failed -> Loading`, then to
//! `Success` or `Failed` once the provider answers. Blank queries and
//! searches issued while one is already in flight are ignored.

use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    error::WeatherError,
    history::SearchHistory,
    model::{CityQuery, CurrentWeather, ForecastDay, WeatherReport, round_temperature},
    provider::WeatherProvider,
    store::{LAST_CITY_KEY, PreferenceStore, SEARCH_HISTORY_KEY},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Success,
    Failed,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub current_city: CityQuery,
    pub weather: Option<CurrentWeather>,
    pub forecast: Vec<ForecastDay>,
    pub history: SearchHistory,
    pub loading: bool,
    pub error: Option<String>,
    /// Window title, e.g. "30°C in Lagos". Set on every successful search.
    pub title: Option<String>,
    pub phase: Phase,
}

/// Title shown for a successful search.
pub fn format_title(current: &CurrentWeather) -> String {
    format!("{}°C in {}", round_temperature(current.temperature_c), current.location_name)
}

pub struct Controller {
    provider: Arc<dyn WeatherProvider>,
    store: Arc<dyn PreferenceStore>,
    state: AppState,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("provider", &self.provider)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Controller {
    /// Builds the controller and hydrates history and last city from `store`.
    /// `default_city` is used when no city was persisted.
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        store: Arc<dyn PreferenceStore>,
        default_city: impl Into<CityQuery>,
    ) -> Self {
        let history = store
            .get(SEARCH_HISTORY_KEY)
            .map(|raw| SearchHistory::deserialize(&raw))
            .unwrap_or_default();

        let current_city = store
            .get(LAST_CITY_KEY)
            .map(CityQuery::new)
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| default_city.into());

        Self {
            provider,
            store,
            state: AppState {
                current_city,
                weather: None,
                forecast: Vec::new(),
                history,
                loading: false,
                error: None,
                title: None,
                phase: Phase::Idle,
            },
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Startup search: the last persisted city, or the default one.
    pub async fn start(&mut self) -> bool {
        let city = self.state.current_city.clone();
        self.search(city).await
    }

    /// Runs one search end to end. Returns `false` when the query was ignored.
    ///
    /// Dropping the returned future mid-fetch puts the controller back in the
    /// phase it had before, with `loading` cleared.
    pub async fn search(&mut self, query: impl Into<CityQuery>) -> bool {
        let previous = self.state.phase;
        let Some(query) = self.begin_search(query) else {
            return false;
        };

        let provider = Arc::clone(&self.provider);
        let in_flight = InFlight { controller: self, previous };

        let result = provider.fetch_weather(&query).await;
        in_flight.controller.complete_search(result);
        true
    }

    /// `search` event. Enters `Loading` and returns the query to fetch, or
    /// `None` if the query is blank or a search is already in flight.
    pub fn begin_search(&mut self, query: impl Into<CityQuery>) -> Option<CityQuery> {
        let query = query.into();

        if query.is_empty() {
            return None;
        }
        if self.state.phase == Phase::Loading {
            info!(city = %query, "Search already in flight, ignoring");
            return None;
        }

        info!(city = %query, "Search started");
        self.state.phase = Phase::Loading;
        self.state.loading = true;
        self.state.error = None;
        self.state.current_city = query.clone();
        Some(query)
    }

    /// `gatewaySucceeds` / `gatewayFails` event. Has no effect unless a search
    /// is in flight, so the loading flag is cleared once per search.
    pub fn complete_search(&mut self, result: Result<WeatherReport, WeatherError>) {
        if self.state.phase != Phase::Loading {
            warn!("Search result arrived with no search in flight, dropping it");
            return;
        }

        match result {
            Ok(report) => self.apply_success(report),
            Err(err) => self.apply_failure(err),
        }

        self.state.loading = false;
    }

    fn apply_success(&mut self, report: WeatherReport) {
        let WeatherReport { current, forecast } = report;
        let canonical = current.location_name.clone();
        let title = format_title(&current);

        self.state.weather = Some(current);
        self.state.forecast = forecast;
        self.state.error = None;
        self.state.phase = Phase::Success;

        if let Err(err) = self.store.set(LAST_CITY_KEY, &canonical) {
            warn!(error = %err, "Failed to persist last city");
        }

        self.state.title = Some(title);

        let history = self.state.history.record(&canonical);
        if history != self.state.history {
            if let Err(err) = self.store.set(SEARCH_HISTORY_KEY, &history.serialize()) {
                warn!(error = %err, "Failed to persist search history");
            }
            self.state.history = history;
        }

        info!(location = %canonical, "Search succeeded");
    }

    fn apply_failure(&mut self, err: WeatherError) {
        info!(error = %err, "Search failed");

        self.state.error = Some(err.to_string());
        self.state.weather = None;
        self.state.forecast.clear();
        self.state.phase = Phase::Failed;
    }
}

/// Clears the loading state of a search that never reached
/// [`Controller::complete_search`], whether it was cancelled or panicked.
struct InFlight<'a> {
    controller: &'a mut Controller,
    previous: Phase,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let state = &mut self.controller.state;
        if state.phase == Phase::Loading {
            warn!(city = %state.current_city, "Search abandoned before completing");
            state.phase = self.previous;
        }
        state.loading = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::{
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    #[derive(Debug, Clone)]
    enum Canned {
        Found { name: String, temp: f64 },
        NotFound,
    }

    /// Answers every query with a canned result and counts calls.
    #[derive(Debug)]
    struct StubProvider {
        canned: Canned,
        calls: AtomicUsize,
        queries: Mutex<Vec<String>>,
    }

    impl StubProvider {
        fn found(name: &str, temp: f64) -> Arc<Self> {
            Arc::new(Self {
                canned: Canned::Found { name: name.to_string(), temp },
                calls: AtomicUsize::new(0),
                queries: Mutex::new(Vec::new()),
            })
        }

        fn not_found() -> Arc<Self> {
            Arc::new(Self {
                canned: Canned::NotFound,
                calls: AtomicUsize::new(0),
                queries: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn sample_report(name: &str, temp: f64) -> WeatherReport {
        let forecast = (15..20)
            .map(|d| ForecastDay {
                date: NaiveDate::from_ymd_opt(2024, 1, d).unwrap(),
                temperature_c: temp - 1.0,
                condition_code: "02d".into(),
            })
            .collect();

        WeatherReport {
            current: CurrentWeather {
                location_name: name.to_string(),
                temperature_c: temp,
                condition_code: "01d".into(),
                condition_description: "clear sky".into(),
            },
            forecast,
        }
    }

    #[async_trait]
    impl WeatherProvider for StubProvider {
        async fn fetch_weather(&self, query: &CityQuery) -> Result<WeatherReport, WeatherError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().unwrap().push(query.to_string());
            match &self.canned {
                Canned::Found { name, temp } => Ok(sample_report(name, *temp)),
                Canned::NotFound => Err(WeatherError::LocationNotFound { status: 404 }),
            }
        }
    }

    /// Never answers in test time.
    #[derive(Debug)]
    struct SlowProvider;

    #[async_trait]
    impl WeatherProvider for SlowProvider {
        async fn fetch_weather(&self, _query: &CityQuery) -> Result<WeatherReport, WeatherError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Err(WeatherError::Network("timed out".into()))
        }
    }

    /// Accepts reads, refuses every write.
    #[derive(Debug, Default)]
    struct ReadOnlyStore;

    impl PreferenceStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("read-only")))
        }
    }

    fn controller(provider: Arc<StubProvider>, store: Arc<MemoryStore>) -> Controller {
        Controller::new(provider, store, "Lagos")
    }

    #[tokio::test]
    async fn lagos_search_succeeds_and_records_history() {
        let provider = StubProvider::found("Lagos", 29.6);
        let store = Arc::new(MemoryStore::new());
        let mut ctl = controller(provider.clone(), store.clone());

        assert!(ctl.search("Lagos").await);

        let state = ctl.state();
        assert_eq!(state.phase, Phase::Success);
        assert!(!state.loading);
        assert!(state.error.is_none());
        let weather = state.weather.as_ref().unwrap();
        assert_eq!(round_temperature(weather.temperature_c), 30);
        assert_eq!(state.forecast.len(), 5);
        assert_eq!(state.history.entries(), ["Lagos"]);
        assert_eq!(state.title.as_deref(), Some("30°C in Lagos"));

        assert_eq!(store.get(LAST_CITY_KEY).as_deref(), Some("Lagos"));
        assert_eq!(store.get(SEARCH_HISTORY_KEY).as_deref(), Some(r#"["Lagos"]"#));
    }

    #[tokio::test]
    async fn empty_query_is_ignored_without_network() {
        let provider = StubProvider::found("Lagos", 29.6);
        let mut ctl = controller(provider.clone(), Arc::new(MemoryStore::new()));

        assert!(!ctl.search("").await);
        assert!(!ctl.search("   ").await);

        assert_eq!(provider.calls(), 0);
        assert_eq!(ctl.state().phase, Phase::Idle);
        assert!(!ctl.state().loading);
    }

    #[tokio::test]
    async fn not_found_fails_and_leaves_history_alone() {
        let store = Arc::new(MemoryStore::with_entries([(SEARCH_HISTORY_KEY, r#"["Paris"]"#)]));
        let mut ctl = controller(StubProvider::not_found(), store.clone());

        ctl.search("Nowhereistan").await;

        let state = ctl.state();
        assert_eq!(state.phase, Phase::Failed);
        assert!(!state.loading);
        assert!(state.error.as_deref().unwrap().contains("not found"));
        assert_eq!(state.history.entries(), ["Paris"]);
        assert_eq!(store.get(SEARCH_HISTORY_KEY).as_deref(), Some(r#"["Paris"]"#));
        assert_eq!(store.get(LAST_CITY_KEY), None);
    }

    #[tokio::test]
    async fn failure_clears_previous_weather() {
        let store = Arc::new(MemoryStore::new());
        let mut ctl = controller(StubProvider::found("Lagos", 29.6), store.clone());
        ctl.search("Lagos").await;
        assert!(ctl.state().weather.is_some());

        // Same state, different provider.
        ctl.provider = StubProvider::not_found();
        ctl.search("Atlantis").await;

        let state = ctl.state();
        assert_eq!(state.phase, Phase::Failed);
        assert!(state.weather.is_none());
        assert!(state.forecast.is_empty());
        assert_eq!(state.history.entries(), ["Lagos"]);
        assert_eq!(store.get(LAST_CITY_KEY).as_deref(), Some("Lagos"));
    }

    #[tokio::test]
    async fn canonical_name_is_persisted_not_raw_input() {
        let provider = StubProvider::found("London", 11.2);
        let store = Arc::new(MemoryStore::new());
        let mut ctl = controller(provider.clone(), store.clone());

        ctl.search("  london ").await;
        ctl.search("LONDON").await;

        assert_eq!(provider.calls(), 2);
        assert_eq!(*provider.queries.lock().unwrap(), ["london", "LONDON"]);
        assert_eq!(ctl.state().history.entries(), ["London"]);
        assert_eq!(store.get(LAST_CITY_KEY).as_deref(), Some("London"));
    }

    #[tokio::test]
    async fn start_uses_persisted_city_then_default() {
        let provider = StubProvider::found("Accra", 31.0);
        let store = Arc::new(MemoryStore::with_entries([(LAST_CITY_KEY, "Accra")]));
        let mut ctl = controller(provider.clone(), store);
        assert!(ctl.start().await);
        assert_eq!(*provider.queries.lock().unwrap(), ["Accra"]);

        let provider = StubProvider::found("Lagos", 29.6);
        let mut ctl = controller(provider.clone(), Arc::new(MemoryStore::new()));
        assert!(ctl.start().await);
        assert_eq!(*provider.queries.lock().unwrap(), ["Lagos"]);
    }

    #[test]
    fn corrupt_persisted_history_hydrates_empty() {
        let store = Arc::new(MemoryStore::with_entries([(SEARCH_HISTORY_KEY, "not valid json")]));
        let ctl = controller(StubProvider::found("Lagos", 29.6), store);
        assert!(ctl.state().history.is_empty());
        assert_eq!(ctl.state().current_city.as_str(), "Lagos");
    }

    #[test]
    fn overlapping_search_is_ignored() {
        let mut ctl = controller(StubProvider::found("Lagos", 29.6), Arc::new(MemoryStore::new()));

        assert_eq!(ctl.begin_search("Lagos"), Some(CityQuery::new("Lagos")));
        assert_eq!(ctl.begin_search("Paris"), None);
        assert_eq!(ctl.state().current_city.as_str(), "Lagos");

        ctl.complete_search(Ok(sample_report("Lagos", 29.6)));
        assert_eq!(ctl.state().phase, Phase::Success);
        assert!(!ctl.state().loading);
    }

    #[test]
    fn stray_completion_is_dropped() {
        let mut ctl = controller(StubProvider::found("Lagos", 29.6), Arc::new(MemoryStore::new()));

        ctl.complete_search(Ok(sample_report("Lagos", 29.6)));

        assert_eq!(ctl.state().phase, Phase::Idle);
        assert!(ctl.state().weather.is_none());
        assert!(ctl.state().history.is_empty());
    }

    #[tokio::test]
    async fn persistence_failures_do_not_block_success() {
        let mut ctl = Controller::new(StubProvider::found("Lagos", 29.6), Arc::new(ReadOnlyStore), "Lagos");

        ctl.search("Lagos").await;

        let state = ctl.state();
        assert_eq!(state.phase, Phase::Success);
        assert!(!state.loading);
        assert_eq!(state.history.entries(), ["Lagos"]);
        assert_eq!(state.title.as_deref(), Some("30°C in Lagos"));
    }

    #[tokio::test]
    async fn history_stays_capped_across_searches() {
        let store = Arc::new(MemoryStore::new());
        let mut ctl = controller(StubProvider::found("Lagos", 29.6), store.clone());

        for name in ["A", "B", "C", "D", "E", "F", "G"] {
            ctl.provider = StubProvider::found(name, 20.0);
            ctl.search(name).await;
            assert!(ctl.state().history.len() <= crate::history::MAX_HISTORY);
        }

        assert_eq!(ctl.state().history.entries(), ["G", "F", "E", "D", "C"]);
        let persisted = SearchHistory::deserialize(&store.get(SEARCH_HISTORY_KEY).unwrap());
        assert_eq!(persisted, ctl.state().history);
    }

    #[tokio::test]
    async fn cancelled_search_releases_loading() {
        let store = Arc::new(MemoryStore::new());
        let mut ctl = Controller::new(Arc::new(SlowProvider), store.clone(), "Lagos");

        let outcome = tokio::time::timeout(Duration::from_millis(50), ctl.search("Lagos")).await;
        assert!(outcome.is_err());

        let state = ctl.state();
        assert_eq!(state.phase, Phase::Idle);
        assert!(!state.loading);
        assert!(state.history.is_empty());

        ctl.provider = StubProvider::found("Paris", 18.0);
        assert!(ctl.search("Paris").await);
        assert_eq!(ctl.state().phase, Phase::Success);
        assert!(!ctl.state().loading);
        assert_eq!(store.get(LAST_CITY_KEY).as_deref(), Some("Paris"));
    }

    #[tokio::test]
    async fn cancelled_search_keeps_earlier_result() {
        let mut ctl = controller(StubProvider::found("Lagos", 29.6), Arc::new(MemoryStore::new()));
        ctl.search("Lagos").await;

        ctl.provider = Arc::new(SlowProvider);
        let outcome = tokio::time::timeout(Duration::from_millis(50), ctl.search("Accra")).await;
        assert!(outcome.is_err());

        let state = ctl.state();
        assert_eq!(state.phase, Phase::Success);
        assert!(!state.loading);
        assert_eq!(state.weather.as_ref().unwrap().location_name, "Lagos");
    }
}
