//! HTTP surface: one `GET /` that runs a search and returns its outcome.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::engine::FinderEngine;
use crate::error::FinderError;
use crate::types::SearchOutcome;

pub const EMPTY_QUERY_MESSAGE: &str = "Please provide a non-empty car_type query parameter.";

#[derive(Debug, Default, Deserialize)]
pub struct FindCarParams {
    #[serde(default)]
    pub car_type:      Option<String>,
    #[serde(default)]
    pub license_plate: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum FindCarResponse {
    Message { message: String },
    Outcome(SearchOutcome),
    Error { error: String },
}

pub async fn find_car(
    State(engine): State<Arc<FinderEngine>>,
    Query(params): Query<FindCarParams>,
) -> (StatusCode, Json<FindCarResponse>) {
    let car_type = params.car_type.as_deref().map(str::trim).unwrap_or_default();
    let license_plate = params.license_plate.as_deref().map(str::trim).unwrap_or_default();

    if car_type.is_empty() {
        return (StatusCode::OK, Json(FindCarResponse::Message {
            message: EMPTY_QUERY_MESSAGE.to_string(),
        }));
    }

    match engine.run(car_type, license_plate).await {
        Ok(outcome) => (StatusCode::OK, Json(FindCarResponse::Outcome(outcome))),
        Err(FinderError::EmptyQuery) => (StatusCode::OK, Json(FindCarResponse::Message {
            message: EMPTY_QUERY_MESSAGE.to_string(),
        })),
        Err(e) => {
            tracing::error!(error = %e, car_type, "search run failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(FindCarResponse::Error { error: e.to_string() }))
        }
    }
}

pub fn router(engine: Arc<FinderEngine>) -> Router {
    Router::new()
        .route("/", get(find_car))
        .with_state(engine)
}

/// Binds `addr` and serves until the process is stopped.
pub async fn serve(engine: Arc<FinderEngine>, addr: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "carfinder listening");
    axum::serve(listener, router(engine)).await
}
