use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cinema_catalog::CatalogError;
use cinema_order::BookingError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("{0}")]
    InvalidSeatSelection(String),

    #[error("Circuit breaker [{0}] is open")]
    CircuitOpen(String),
}

impl AppError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Booking(err) => {
                let status = match err {
                    BookingError::InvalidSeatSelection(_)
                    | BookingError::PartySizeMismatch { .. }
                    | BookingError::InvalidCodeFormat(_) => StatusCode::BAD_REQUEST,
                    BookingError::ShowtimeNotFound(_) | BookingError::ReservationNotFound(_) => {
                        StatusCode::NOT_FOUND
                    }
                    BookingError::SeatUnavailable(_)
                    | BookingError::AlreadyRefunded(_)
                    | BookingError::ShowtimeStarted => StatusCode::CONFLICT,
                    BookingError::PaymentDeclined(_) => StatusCode::PAYMENT_REQUIRED,
                    BookingError::HoldExpired => StatusCode::GONE,
                    BookingError::PaymentUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                    BookingError::HoldNotFound
                    | BookingError::CodeGenerationExhausted
                    | BookingError::Storage(_)
                    | BookingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.kind())
            }
            AppError::Catalog(CatalogError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "SHOWTIME_NOT_FOUND")
            }
            AppError::Catalog(CatalogError::AlreadyExists(_)) => {
                (StatusCode::CONFLICT, "SHOWTIME_EXISTS")
            }
            AppError::Catalog(CatalogError::InvalidShowtime(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_SHOWTIME")
            }
            AppError::InvalidSeatSelection(_) => {
                (StatusCode::BAD_REQUEST, "INVALID_SEAT_SELECTION")
            }
            AppError::CircuitOpen(_) => (StatusCode::SERVICE_UNAVAILABLE, "CIRCUIT_OPEN"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();

        let message = if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            tracing::error!("Internal Server Error: {}", self);
            "Internal Server Error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "error": kind,
            "message": message,
        }));

        (status, body).into_response()
    }
}
