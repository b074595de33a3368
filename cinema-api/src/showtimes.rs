use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use cinema_catalog::{SeatMapView, Showtime};
use cinema_core::ShowtimeId;
use futures_util::{Stream, StreamExt};
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::error::AppError;
use crate::reservations::ReservationResponse;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/showtimes", get(list_showtimes))
        .route("/v1/showtimes/{id}/seats", get(seat_map))
        .route("/v1/showtimes/{id}/reservations", get(list_reservations))
        .route("/v1/showtimes/{id}/stream", get(stream_seat_changes))
}

async fn list_showtimes(State(state): State<AppState>) -> Result<Json<Vec<Showtime>>, AppError> {
    Ok(Json(state.catalog.list_showtimes().await?))
}

async fn seat_map(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SeatMapView>, AppError> {
    Ok(Json(state.bookings.seat_map(ShowtimeId::from(id)).await?))
}

async fn list_reservations(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ReservationResponse>>, AppError> {
    let reservations = state.bookings.list_reservations(ShowtimeId::from(id)).await?;
    Ok(Json(reservations.into_iter().map(ReservationResponse::from).collect()))
}

/// Live seat changes of one showtime. Lagging subscribers silently skip
/// the events they missed.
async fn stream_seat_changes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    state.catalog.get_showtime(ShowtimeId::from(id)).await?;

    let rx = state.sse_tx.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |result| async move {
        match result {
            Ok(event) if event.showtime_id == id => {
                let data = serde_json::to_string(&event).ok()?;
                Some(Ok(Event::default().event(event.event_name()).data(data)))
            }
            _ => None,
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
