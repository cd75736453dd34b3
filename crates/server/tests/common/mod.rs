//! Common test utilities for E2E testing with mocks.
//!
//! Builds the status server router in-process with a dispatcher whose
//! collaborators are all mocks, so requests can be sent with `oneshot`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::Mutex;
use tower::ServiceExt;

use tunecast_core::{
    greeting::GreetingSource,
    testing::{MockCatalogSource, MockNotifier, MockWeatherSource},
    CatalogCache, Config, DestinationRegistry, Dispatcher, HistoryStore, SelectionPolicy,
    Selector, WeatherCache,
};
use tunecast_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
#[allow(unused_imports)]
pub use tunecast_core::testing::fixtures;

pub const HOOK: &str = "https://hooks.example.com/e2e";

/// Test fixture for E2E testing with mock dependencies.
pub struct TestFixture {
    pub router: Router,
    pub catalog: Arc<MockCatalogSource>,
    #[allow(dead_code)]
    pub weather: Arc<MockWeatherSource>,
    pub notifier: Arc<MockNotifier>,
    pub temp_dir: TempDir,
}

/// Response from a test request.
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path();

        let catalog = Arc::new(MockCatalogSource::new());
        let weather = Arc::new(MockWeatherSource::new());
        let notifier = Arc::new(MockNotifier::new());

        let mut destinations = BTreeMap::new();
        destinations.insert(HOOK.to_string(), vec!["g1".to_string()]);

        let dispatcher = Dispatcher::new(
            DestinationRegistry::new(destinations),
            CatalogCache::new(root.join("cache"), catalog.clone(), 1000),
            HistoryStore::new(root.join("history.json")),
            Selector::new(SelectionPolicy::Uniform, true),
            WeatherCache::new(
                root.join("weather_cache.json"),
                Some(weather.clone()),
                3,
                Duration::from_millis(1),
            ),
            GreetingSource::new(root.join("greetings")),
            notifier.clone(),
        );

        let state = Arc::new(AppState::new(
            config,
            Arc::new(Mutex::new(dispatcher)),
            None,
        ));

        Self {
            router: create_router(state),
            catalog,
            weather,
            notifier,
            temp_dir,
        }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path).await
    }

    pub async fn post(&self, path: &str) -> TestResponse {
        self.request("POST", path).await
    }

    /// GET returning the raw body text.
    #[allow(dead_code)]
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn request(&self, method: &str, path: &str) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}
