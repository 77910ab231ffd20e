//! Clinic Dialysis API Server
//!
//! REST surface over the session lifecycle, machine allocator, and clinical
//! alert engine. Persistence and patient master data are external
//! collaborators; the in-memory implementations back this server.

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::GovernorLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod error;
mod rate_limit;
mod routes;
mod settings;

pub use error::ApiError;
pub use rate_limit::{create_governor_config, RateLimitConfig};
pub use settings::Settings;

use alert_engine::{AlertEngine, AlertLifecycle, InMemoryClinicalData};
use machine_allocator::MachineAllocator;
use session_lifecycle::{PatientDirectory, SessionManager};
use storage::Repository;
use uuid::Uuid;

/// Bridges the in-memory clinical data set into the lifecycle's
/// patient-directory seam.
struct DirectoryAdapter(Arc<InMemoryClinicalData>);

impl PatientDirectory for DirectoryAdapter {
    fn requires_isolation(&self, patient_id: Uuid) -> bool {
        self.0.requires_isolation(patient_id)
    }
}

/// Application state shared across handlers
pub struct AppState {
    /// Storage repository
    pub repository: Arc<Repository>,
    /// Patient clinical data (external collaborator, in-memory here)
    pub clinical_data: Arc<InMemoryClinicalData>,
    pub sessions: SessionManager,
    pub allocator: MachineAllocator,
    pub alert_engine: AlertEngine,
    pub alert_lifecycle: AlertLifecycle,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create new application state from settings
    pub fn new(settings: &Settings) -> Self {
        let repository = Arc::new(Repository::new());
        let clinical_data = Arc::new(InMemoryClinicalData::new());
        let allocator = MachineAllocator::new(Arc::clone(&repository));
        let sessions = SessionManager::new(
            Arc::clone(&repository),
            allocator.clone(),
            Arc::new(DirectoryAdapter(Arc::clone(&clinical_data))),
            settings.vitals.clone(),
        );
        let alert_engine = AlertEngine::new(
            Arc::clone(&repository),
            Arc::clone(&clinical_data) as Arc<dyn alert_engine::ClinicalDataProvider>,
            settings.rules.clone(),
        );
        let alert_lifecycle = AlertLifecycle::new(Arc::clone(&repository));
        Self {
            repository,
            clinical_data,
            sessions,
            allocator,
            alert_engine,
            alert_lifecycle,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub metrics: SystemMetrics,
}

/// System metrics
#[derive(Debug, Serialize)]
pub struct SystemMetrics {
    pub session_count: usize,
    pub record_count: usize,
    pub alert_count: usize,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/sessions", post(routes::sessions::create))
        .route("/api/v1/sessions/:id", get(routes::sessions::get_one))
        .route("/api/v1/sessions/:id/check-in", post(routes::sessions::check_in))
        .route("/api/v1/sessions/:id/start", post(routes::sessions::start))
        .route("/api/v1/sessions/:id/complete", post(routes::sessions::complete))
        .route("/api/v1/sessions/:id/cancel", post(routes::sessions::cancel))
        .route("/api/v1/sessions/:id/no-show", post(routes::sessions::no_show))
        .route(
            "/api/v1/sessions/:id/records",
            post(routes::sessions::add_record).get(routes::sessions::get_records),
        )
        .route("/api/v1/sessions/:id/incidents", post(routes::sessions::add_incident))
        .route("/api/v1/alerts", get(routes::alerts::list))
        .route("/api/v1/alerts/generate", post(routes::alerts::generate))
        .route("/api/v1/alerts/:id/acknowledge", post(routes::alerts::acknowledge))
        .route("/api/v1/alerts/:id/resolve", post(routes::alerts::resolve))
        .route("/api/v1/alerts/:id/dismiss", post(routes::alerts::dismiss))
        .route("/api/v1/machines/available", get(routes::machines::available))
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let response = HealthResponse {
        status: "healthy".to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        metrics: SystemMetrics {
            session_count: state.repository.session_count(),
            record_count: state.repository.record_count(),
            alert_count: state.repository.alert_count(),
        },
    };

    Json(response)
}

/// Initialize logging
pub fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Run the server
pub async fn run_server(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::new(&settings));
    let governor = create_governor_config(&settings.rate_limit);

    let app = create_router(state)
        .layer(GovernorLayer { config: governor })
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    info!("Starting clinic API server on {}", settings.bind_addr);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::util::ServiceExt;

    #[tokio::test]
    async fn test_health_endpoint() {
        let state = Arc::new(AppState::new(&Settings::default()));
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let state = Arc::new(AppState::new(&Settings::default()));
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
