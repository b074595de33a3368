use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use chrono::{DateTime, Utc};
use cinema_catalog::{SeatGeometry, Showtime};
use cinema_core::ShowtimeId;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterShowtimeRequest {
    /// Generated when absent.
    pub id: Option<Uuid>,
    pub movie_id: String,
    pub movie_title: String,
    pub cinema: String,
    pub screen: String,
    pub starts_at: DateTime<Utc>,
    pub rows: u16,
    pub seats_per_row: u16,
    pub price_per_seat: i64,
    pub currency: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/admin/showtimes", post(register_showtime))
}

async fn register_showtime(
    State(state): State<AppState>,
    Json(req): Json<RegisterShowtimeRequest>,
) -> Result<(StatusCode, Json<Showtime>), AppError> {
    let showtime = Showtime {
        id: req.id.map(ShowtimeId::from).unwrap_or_default(),
        movie_id: req.movie_id,
        movie_title: req.movie_title,
        cinema: req.cinema,
        screen: req.screen,
        starts_at: req.starts_at,
        geometry: SeatGeometry::new(req.rows, req.seats_per_row),
        price_per_seat: req.price_per_seat,
        currency: req.currency,
    };

    state.catalog.register(showtime.clone()).await?;
    info!(
        "Showtime registered: {} ({} at {})",
        showtime.id, showtime.movie_title, showtime.starts_at
    );

    Ok((StatusCode::CREATED, Json(showtime)))
}
