use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tagwatch_common::Config;
use tagwatch_scout::fetch::BrowserlessFetcher;
use tagwatch_scout::notify::NotifyChannel;
use tagwatch_scout::scout::Scout;
use tagwatch_store::PostgresPostStore;

#[derive(Clone)]
struct AppState {
    store: Arc<PostgresPostStore>,
    scout: Arc<Scout>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tagwatch_api=info".parse()?))
        .init();

    info!("Tagwatch API starting...");

    let config = Config::from_env();

    let store = Arc::new(PostgresPostStore::connect(&config.database_url).await?);
    store.migrate().await?;

    let fetcher = Arc::new(BrowserlessFetcher::new(
        &config.browserless_url,
        config.browserless_token.as_deref(),
        Duration::from_secs(config.fetch_timeout_secs),
    ));

    let channel: Option<Arc<dyn NotifyChannel>> =
        match (&config.telegram_bot_token, &config.telegram_chat_id) {
            (Some(token), Some(chat_id)) => Some(Arc::new(
                telegram_client::TelegramClient::new(token, chat_id),
            )),
            _ => None,
        };

    let scout = Arc::new(Scout::new(
        &config.monitor(),
        fetcher,
        store.clone(),
        channel,
        Duration::from_millis(config.request_delay_ms),
    ));

    let state = AppState { store, scout };

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/posts", get(list_posts))
        .route("/scrape", post(trigger_scrape))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{}:{}", config.api_host, config.api_port);
    info!(addr = addr.as_str(), "Listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "service": "tagwatch-api",
        "endpoints": ["/health", "/posts", "/scrape"],
    }))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// All stored posts, most recently scraped first.
async fn list_posts(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.list_all().await {
        Ok(posts) => Json(json!({ "count": posts.len(), "posts": posts })).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to list posts");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "failed to list posts" })),
            )
                .into_response()
        }
    }
}

/// Run one scrape pass inline and report its counters.
async fn trigger_scrape(State(state): State<AppState>) -> impl IntoResponse {
    match state.scout.run().await {
        Ok(stats) => Json(json!({ "status": "completed", "stats": stats })).into_response(),
        Err(e) => {
            warn!(error = %e, "Scrape run failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
