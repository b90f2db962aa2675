use std::sync::Arc;

use anyhow::Result;
use axum::http::{header, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gemini_client::Gemini;
use tavily_client::TavilyClient;
use timelineforge_common::Config;
use timelineforge_investigator::{EvidenceCollector, HypothesisTester, Investigator, Monitor};
use timelineforge_store::Store;

mod auth;
mod error;
mod jwt;
mod rest;
mod vision;

use jwt::JwtService;

const JWT_ISSUER: &str = "timelineforge";

pub struct AppState {
    pub store: Arc<Store>,
    pub jwt: JwtService,
    pub gemini: Arc<Gemini>,
    pub http: reqwest::Client,
    pub investigator: Arc<Investigator>,
    pub collector: EvidenceCollector,
    pub tester: HypothesisTester,
    pub monitor: Monitor,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("timelineforge=info".parse()?),
        )
        .init();

    let config = Config::from_env();
    config.log_redacted();

    let store = Arc::new(Store::connect(&config.database_url).await?);
    store.migrate().await?;

    let gemini = Arc::new(Gemini::new(&config.gemini_api_key, gemini_client::DEFAULT_MODEL));
    let tavily = Arc::new(TavilyClient::new(&config.tavily_api_key));

    let investigator = Arc::new(Investigator::new(
        store.clone(),
        tavily.clone(),
        gemini.clone(),
    ));

    let state = Arc::new(AppState {
        store: store.clone(),
        jwt: JwtService::new(&config.jwt_secret, JWT_ISSUER.to_string()),
        gemini: gemini.clone(),
        http: reqwest::Client::new(),
        investigator: investigator.clone(),
        collector: EvidenceCollector::new(tavily.clone(), gemini.clone()),
        tester: HypothesisTester::new(store.clone(), tavily, gemini),
        monitor: Monitor::new(store, investigator),
    });

    let app = Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        // Pipeline endpoints
        .route("/functions/marathon-investigator", post(rest::investigate))
        .route("/functions/evidence-collector", post(rest::collect_evidence))
        .route("/functions/gemini-vision", post(rest::vision_analyze))
        .route("/functions/hypothesis-tester", post(rest::test_hypothesis))
        .route("/functions/monitor-scheduler", post(rest::monitor_sweep))
        // Event management
        .route("/api/events", post(rest::create_event))
        .route("/api/events/{id}", get(rest::get_event))
        .route("/api/events/{id}/merge", post(rest::merge_branches))
        .with_state(state)
        // CORS
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Investigation data is per-user; keep it out of shared caches
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        // Logging layer: method + path + status + latency only (no query params)
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        );

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("TimelineForge API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
