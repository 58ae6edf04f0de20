use crate::application::app::Application;
use crate::domain::errors::EnqueueError;
use crate::domain::models::{CancelEscrow, CreateEscrow, EntrySummary, RecordedOutcome};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;

pub async fn start_server(
    shutdown: broadcast::Sender<()>,
    app: Arc<impl Application + Send + Sync + 'static>,
    listen_port: u16,
) -> anyhow::Result<()> {
    let router = Router::new()
        .route("/escrow/create", post(create_escrow))
        .route("/escrow/cancel", post(cancel_escrow))
        .route("/queue", get(get_queue))
        .route("/queue/:id", delete(remove_entry))
        .route("/outcomes", get(get_outcomes))
        .route("/history", get(get_history))
        .with_state(app)
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", listen_port)).await?;

    let server = axum::serve(listener, router);

    tracing::info!("API server started on port {}", listen_port);

    let mut shutdown_rx = shutdown.subscribe();

    tokio::select! {
        _ = shutdown_rx.recv() => {
            tracing::warn!("API server received shutdown signal");
        }
        _ = server => {
            tracing::warn!("API server stopped unexpectedly");
        }
    }

    Ok(())
}

fn enqueue_status(err: &EnqueueError) -> StatusCode {
    match err {
        EnqueueError::InvalidAmount(_)
        | EnqueueError::InvalidDuration(_)
        | EnqueueError::InvalidSequence => StatusCode::BAD_REQUEST,
        EnqueueError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
        EnqueueError::WalletMismatch { .. } => StatusCode::CONFLICT,
        EnqueueError::Ledger(_) | EnqueueError::Wallet(_) => StatusCode::BAD_GATEWAY,
    }
}

#[derive(Serialize)]
struct Enqueued {
    entry_id: u64,
}

async fn create_escrow(
    State(app): State<Arc<impl Application>>,
    Json(intent): Json<CreateEscrow>,
) -> Result<Json<Enqueued>, (StatusCode, String)> {
    app.queue_escrow_create(intent)
        .await
        .map(|entry_id| Json(Enqueued { entry_id }))
        .map_err(|e| (enqueue_status(&e), e.to_string()))
}

async fn cancel_escrow(
    State(app): State<Arc<impl Application>>,
    Json(intent): Json<CancelEscrow>,
) -> Result<Json<Enqueued>, (StatusCode, String)> {
    app.queue_escrow_cancel(intent)
        .await
        .map(|entry_id| Json(Enqueued { entry_id }))
        .map_err(|e| (enqueue_status(&e), e.to_string()))
}

async fn get_queue(State(app): State<Arc<impl Application>>) -> Json<Vec<EntrySummary>> {
    Json(app.queue_snapshot().await)
}

async fn remove_entry(
    State(app): State<Arc<impl Application>>,
    Path(id): Path<u64>,
) -> StatusCode {
    if app.remove_entry(id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

#[derive(Deserialize)]
struct OutcomeQuery {
    id: Option<u64>,
    day: Option<String>,
}

async fn get_outcomes(
    State(app): State<Arc<impl Application>>,
    Query(params): Query<OutcomeQuery>,
) -> Result<Json<Vec<RecordedOutcome>>, StatusCode> {
    if let Some(id) = params.id {
        return app
            .outcome(id)
            .await
            .map(|outcome| Json(vec![outcome]))
            .map_err(|_| StatusCode::NOT_FOUND);
    }

    if let Some(day) = params.day {
        let day =
            NaiveDate::parse_from_str(&day, "%Y-%m-%d").map_err(|_| StatusCode::BAD_REQUEST)?;
        app.outcomes(Some(day.format("%Y-%m-%d").to_string()))
            .await
            .map(Json)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
    } else {
        app.outcomes(None)
            .await
            .map(Json)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
    }
}

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

async fn get_history(
    State(app): State<Arc<impl Application>>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<Vec<Value>>, StatusCode> {
    app.recent_transactions(params.limit.unwrap_or(10))
        .await
        .map(Json)
        .map_err(|_| StatusCode::BAD_GATEWAY)
}
