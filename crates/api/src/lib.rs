//! Aqualog API Server
//!
//! Wires the record store, the live feed and the editor together and serves
//! the dashboard and history over HTTP.

use axum::{
    routing::{get, post},
    Router,
};
use feed_listener::{FeedHandle, FeedListener, FeedSource, MqttFeed, SimulatedFeed};
use reconciler::ReconciliationEngine;
use record_store::{FileStore, RecordStore};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

mod confirm;
mod error;
mod routes;
mod settings;
mod state;
mod telemetry;

pub use confirm::{ConfirmationTokens, CONFIRMATION_TTL};
pub use error::{ApiError, ErrorBody};
pub use settings::{
    DashboardSettings, FeedKind, FeedSettings, LogFormat, LogSettings, ServerSettings, Settings, ShapeKind,
    SplitChannels, StorageSettings,
};
pub use state::AppState;
pub use telemetry::{init_logging, install_metrics};

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(routes::health::health))
        .route("/api/v1/readings/latest", get(routes::readings::latest))
        .route(
            "/api/v1/records",
            get(routes::records::list)
                .post(routes::records::create)
                .delete(routes::records::delete_all),
        )
        .route("/api/v1/records/delete-all", post(routes::records::request_delete_all))
        .route(
            "/api/v1/records/:id",
            get(routes::records::get_one)
                .patch(routes::records::update)
                .delete(routes::records::delete),
        )
        .route("/metrics", get(routes::health::metrics))
        .with_state(state)
}

/// A running feed subscription and the source behind it
pub struct LiveFeed {
    // Dropped after the handle; MQTT stops its event loop on drop
    handle: FeedHandle,
    _source: Box<dyn FeedSource>,
}

impl LiveFeed {
    pub fn stop(self) {
        self.handle.unsubscribe();
        info!("Feed stopped");
    }
}

/// Subscribe the configured feed into the engine
///
/// Returns `None` when the feed is disabled.
pub async fn start_feed(
    settings: &FeedSettings,
    engine: Arc<ReconciliationEngine>,
) -> Result<Option<LiveFeed>, ApiError> {
    let source: Box<dyn FeedSource> = match settings.kind {
        FeedKind::Disabled => {
            info!("Live feed disabled");
            return Ok(None);
        }
        FeedKind::Simulated => Box::new(SimulatedFeed::new(settings.simulated_interval())),
        FeedKind::Mqtt => Box::new(MqttFeed::connect(&settings.mqtt)),
    };

    let listener = FeedListener::new(settings.shape())?;
    let handle = listener
        .start(source.as_ref(), move |reading| {
            if let Err(e) = engine.on_reading(reading) {
                warn!("Reading dropped: {}", e);
            }
        })
        .await?;

    Ok(Some(LiveFeed {
        handle,
        _source: source,
    }))
}

/// Run the daemon until Ctrl-C
pub async fn run(settings: Settings) -> Result<(), ApiError> {
    tokio::fs::create_dir_all(&settings.storage.data_dir).await?;
    info!("Data directory: {}", settings.storage.data_dir.display());

    // Hydration finishes here, before any reading can be reconciled
    let storage = Arc::new(FileStore::new(settings.storage.data_dir.clone()));
    let store = Arc::new(RecordStore::open(storage, settings.storage.key.clone()).await);

    let state = AppState::new(
        store.clone(),
        settings.validation.clone(),
        settings.dashboard.stale_after(),
    )
    .with_metrics(install_metrics()?);
    let state = Arc::new(state);

    let feed = start_feed(&settings.feed, state.engine.clone()).await?;

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    info!("Starting API server on {}", settings.server.bind);
    let listener = tokio::net::TcpListener::bind(&settings.server.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(feed) = feed {
        feed.stop();
    }
    store
        .flush()
        .await
        .map_err(|e| ApiError::Startup(format!("final flush failed: {}", e)))?;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use data_validator::ValidationConfig;
    use record_store::MemoryStore;
    use sensor_model::{FieldValue, Reading, RecordFields};
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    async fn test_state() -> Arc<AppState> {
        let store = Arc::new(RecordStore::open(Arc::new(MemoryStore::new()), "records").await);
        Arc::new(AppState::new(store, ValidationConfig::default(), Duration::from_secs(30)))
    }

    async fn send(state: &Arc<AppState>, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = create_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn reading(tds: f64) -> Reading {
        Reading::new(
            RecordFields {
                temperature: FieldValue::Number(24.3),
                tds: FieldValue::Number(tds),
                turbidity: FieldValue::from("low"),
                water_level: FieldValue::Unavailable,
            },
            chrono::Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_health() {
        let state = test_state().await;
        let (status, body) = send(&state, Method::GET, "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["record_count"], 0);
    }

    #[tokio::test]
    async fn test_latest_reading_loading_then_live() {
        let state = test_state().await;
        let (_, body) = send(&state, Method::GET, "/api/v1/readings/latest", None).await;
        assert_eq!(body["status"], "loading");

        state.engine.on_reading(reading(310.0)).unwrap();
        let (_, body) = send(&state, Method::GET, "/api/v1/readings/latest", None).await;
        assert_eq!(body["status"], "live");
        assert_eq!(body["stale"], false);
        assert_eq!(body["fields"][1]["display"], "310 ppm");
        assert_eq!(body["fields"][3]["display"], "N/A");
    }

    #[tokio::test]
    async fn test_create_update_delete_flow() {
        let state = test_state().await;

        let (status, created) = send(
            &state,
            Method::POST,
            "/api/v1/records",
            Some(json!({"temperature": "24.5", "tds": 300, "waterLevel": "High"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["origin"], "manual");
        let id = created["id"].as_str().unwrap().to_string();

        let uri = format!("/api/v1/records/{}", id);
        let (status, updated) = send(&state, Method::PATCH, &uri, Some(json!({"tds": 450}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["tds"], 450.0);
        assert_eq!(updated["temperature"], 24.5);
        assert_eq!(updated["createdAt"], created["createdAt"]);

        let (status, _) = send(&state, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&state, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&state, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn test_patch_errors() {
        let state = test_state().await;
        let record = state.engine.on_reading(reading(300.0)).unwrap();
        let uri = format!("/api/v1/records/{}", record.id());

        let (status, _) = send(&state, Method::PATCH, "/api/v1/records/missing", Some(json!({"tds": 1}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&state, Method::PATCH, &uri, Some(json!({"tds": "lots"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "invalid_input");
        assert_eq!(state.store.get(record.id()).unwrap(), record);
    }

    #[tokio::test]
    async fn test_list_with_limit_and_origin() {
        let state = test_state().await;
        for tds in [1.0, 2.0, 3.0] {
            state.engine.on_reading(reading(tds)).unwrap();
        }

        let (_, body) = send(&state, Method::GET, "/api/v1/records?limit=2", None).await;
        assert_eq!(body["meta"]["count"], 2);
        assert_eq!(body["meta"]["total"], 3);
        assert_eq!(body["data"][0]["tds"], 2.0);
        assert_eq!(body["data"][1]["tds"], 3.0);

        let (_, body) = send(&state, Method::GET, "/api/v1/records?origin=manual", None).await;
        assert_eq!(body["meta"]["count"], 0);
    }

    #[tokio::test]
    async fn test_delete_all_requires_confirmation() {
        let state = test_state().await;
        state.engine.on_reading(reading(300.0)).unwrap();

        let (status, body) = send(&state, Method::DELETE, "/api/v1/records", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "confirmation_required");
        let (status, _) = send(&state, Method::DELETE, "/api/v1/records?confirm=bogus", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(state.store.len(), 1);

        let (status, body) = send(&state, Method::POST, "/api/v1/records/delete-all", None).await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap().to_string();

        let uri = format!("/api/v1/records?confirm={}", token);
        let (status, _) = send(&state, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(state.store.is_empty());
        assert!(state.store.load().await.unwrap().is_empty());

        let (status, _) = send(&state, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_metrics_without_recorder() {
        let state = test_state().await;
        let response = create_router(state)
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_disabled_feed_starts_nothing() {
        let state = test_state().await;
        let settings = FeedSettings {
            kind: FeedKind::Disabled,
            ..Default::default()
        };
        assert!(start_feed(&settings, state.engine.clone()).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_feed_reconciles_into_store() {
        let state = test_state().await;
        let settings = FeedSettings {
            simulated_interval_ms: 1_000,
            ..Default::default()
        };
        let feed = start_feed(&settings, state.engine.clone()).await.unwrap().unwrap();

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        feed.stop();
        let count = state.store.len();
        assert_eq!(count, 3);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(state.store.len(), count);
        assert!(state.engine.latest().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_split_simulated_feed_records_each_reading_once() {
        let state = test_state().await;
        let settings = FeedSettings {
            shape: ShapeKind::Split,
            simulated_interval_ms: 1_000,
            ..Default::default()
        };
        let feed = start_feed(&settings, state.engine.clone()).await.unwrap().unwrap();

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        feed.stop();

        let records = state.store.snapshot();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.fields.available_count() == 3));
    }
}
