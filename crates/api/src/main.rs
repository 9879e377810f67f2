use axum::{extract::State, http::StatusCode, routing::get, routing::post, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cfa_core::domain::section::{Section, SectionSelection};
use cfa_core::report::{ReportError, ReportService, SectionReport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = cfa_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let service = match ReportService::from_settings(&settings) {
        Ok(service) => service,
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "report service configuration failed");
            return Err(e);
        }
    };

    let app = router(AppState { service });

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/sections", get(list_sections))
        .route("/reports", post(generate_report))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    service: ReportService,
}

async fn list_sections() -> Json<Vec<&'static str>> {
    Json(Section::ALL.iter().map(|s| s.label()).collect())
}

#[derive(Debug, Deserialize)]
struct GenerateReportRequest {
    ticker: String,
    #[serde(default)]
    sections: Vec<String>,
}

#[derive(Debug, Serialize)]
struct GenerateReportResponse {
    ticker: String,
    sections: Vec<SectionReport>,
    report: String,
    generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

fn api_error(status: StatusCode, error: impl ToString) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            error: error.to_string(),
        }),
    )
}

async fn generate_report(
    State(state): State<AppState>,
    Json(req): Json<GenerateReportRequest>,
) -> ApiResult<GenerateReportResponse> {
    let selection = SectionSelection::parse(&req.sections)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;

    let report = state
        .service
        .generate(&req.ticker, &selection)
        .await
        .map_err(|err| match err {
            ReportError::EmptyTicker(_) => api_error(StatusCode::BAD_REQUEST, err),
            ReportError::DataFetch(_) => {
                sentry_anyhow::capture_anyhow(&anyhow::Error::new(err.clone()));
                api_error(StatusCode::BAD_GATEWAY, err)
            }
        })?;

    Ok(Json(GenerateReportResponse {
        ticker: req.ticker.trim().to_string(),
        report: report.render(),
        sections: report.sections().to_vec(),
        generated_at: Utc::now(),
    }))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &cfa_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
