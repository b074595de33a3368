use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use cinema_core::{ReservationCode, SeatId, ShowtimeId};
use cinema_order::{BookingReceipt, BookingRequest, Reservation, ReservationStatus};
use cinema_shared::Masked;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateReservationRequest {
    pub showtime_id: Uuid,
    /// Seat labels such as `A1`.
    pub seats: Vec<String>,
    pub party_size: usize,
    pub payment_method: Masked<String>,
}

#[derive(Debug, Serialize)]
pub struct ReservationResponse {
    pub code: ReservationCode,
    pub showtime_id: ShowtimeId,
    pub seats: Vec<SeatId>,
    pub party_size: usize,
    pub total_amount: i64,
    pub currency: String,
    pub status: ReservationStatus,
    pub starts_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub refunded_at: Option<DateTime<Utc>>,
}

impl From<Reservation> for ReservationResponse {
    fn from(r: Reservation) -> Self {
        Self {
            code: r.code,
            showtime_id: r.showtime_id,
            seats: r.seats,
            party_size: r.party_size,
            total_amount: r.total_amount,
            currency: r.currency,
            status: r.status,
            starts_at: r.starts_at,
            created_at: r.created_at,
            refunded_at: r.refunded_at,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/reservations", post(create_reservation))
        .route("/v1/reservations/{code}", get(get_reservation))
        .route("/v1/reservations/{code}/refund", post(refund_reservation))
}

async fn create_reservation(
    State(state): State<AppState>,
    Json(req): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<BookingReceipt>), AppError> {
    let seats = req
        .seats
        .iter()
        .map(|label| SeatId::parse(label))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::InvalidSeatSelection(e.to_string()))?;

    let receipt = state
        .bookings
        .book(BookingRequest {
            showtime_id: ShowtimeId::from(req.showtime_id),
            seats,
            party_size: req.party_size,
            payment_method: req.payment_method,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn get_reservation(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ReservationResponse>, AppError> {
    let reservation = state.bookings.get_reservation(&code).await?;
    Ok(Json(reservation.into()))
}

async fn refund_reservation(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ReservationResponse>, AppError> {
    let reservation = state.bookings.refund(&code).await?;
    Ok(Json(reservation.into()))
}
