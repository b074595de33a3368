use cinema_catalog::{CatalogError, InventoryError};
use cinema_core::payment::PaymentError;
use cinema_core::{CoreError, ReservationCode, SeatId, ShowtimeId};

use crate::codes::CodeError;
use crate::ledger::LedgerError;

/// Every way a booking, lookup or refund can fail. Each variant is a
/// distinct kind the caller can act on.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum BookingError {
    #[error("Invalid seat selection: {0}")]
    InvalidSeatSelection(String),

    #[error("Party size mismatch: {seats} seats requested for a party of {party_size}")]
    PartySizeMismatch { seats: usize, party_size: usize },

    #[error("Showtime not found: {0}")]
    ShowtimeNotFound(ShowtimeId),

    #[error("Showtime has already started")]
    ShowtimeStarted,

    #[error("Seats unavailable: {}", seat_list(.0))]
    SeatUnavailable(Vec<SeatId>),

    #[error("Payment declined: {0}")]
    PaymentDeclined(String),

    #[error("Payment provider unavailable: {0}")]
    PaymentUnavailable(String),

    #[error("Seat hold expired before the booking could be committed")]
    HoldExpired,

    #[error("Seat hold not found")]
    HoldNotFound,

    #[error("Invalid reservation code format: {0}")]
    InvalidCodeFormat(String),

    #[error("Reservation not found: {0}")]
    ReservationNotFound(ReservationCode),

    #[error("Reservation already refunded: {0}")]
    AlreadyRefunded(ReservationCode),

    #[error("Could not issue a unique reservation code")]
    CodeGenerationExhausted,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn seat_list(seats: &[SeatId]) -> String {
    seats.iter().map(SeatId::label).collect::<Vec<_>>().join(", ")
}

impl BookingError {
    /// Stable machine-readable kind for clients.
    pub fn kind(&self) -> &'static str {
        match self {
            BookingError::InvalidSeatSelection(_) => "INVALID_SEAT_SELECTION",
            BookingError::PartySizeMismatch { .. } => "PARTY_SIZE_MISMATCH",
            BookingError::ShowtimeNotFound(_) => "SHOWTIME_NOT_FOUND",
            BookingError::ShowtimeStarted => "SHOWTIME_STARTED",
            BookingError::SeatUnavailable(_) => "SEAT_UNAVAILABLE",
            BookingError::PaymentDeclined(_) => "PAYMENT_DECLINED",
            BookingError::PaymentUnavailable(_) => "PAYMENT_UNAVAILABLE",
            BookingError::HoldExpired => "HOLD_EXPIRED",
            BookingError::HoldNotFound => "HOLD_NOT_FOUND",
            BookingError::InvalidCodeFormat(_) => "INVALID_CODE_FORMAT",
            BookingError::ReservationNotFound(_) => "RESERVATION_NOT_FOUND",
            BookingError::AlreadyRefunded(_) => "ALREADY_REFUNDED",
            BookingError::CodeGenerationExhausted => "CODE_GENERATION_EXHAUSTED",
            BookingError::Storage(_) => "STORAGE_ERROR",
            BookingError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<InventoryError> for BookingError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::EmptySelection => {
                BookingError::InvalidSeatSelection("no seats requested".to_string())
            }
            InventoryError::UnknownSeat(seat) => {
                BookingError::InvalidSeatSelection(format!("seat {} does not exist", seat))
            }
            InventoryError::DuplicateSeat(seat) => BookingError::InvalidSeatSelection(format!(
                "seat {} requested more than once",
                seat
            )),
            InventoryError::PartySizeMismatch { seats, party_size } => {
                BookingError::PartySizeMismatch { seats, party_size }
            }
            InventoryError::SeatUnavailable(seats) => BookingError::SeatUnavailable(seats),
            InventoryError::HoldExpired { .. } => BookingError::HoldExpired,
            InventoryError::HoldNotFound(_) => BookingError::HoldNotFound,
            InventoryError::ShowtimeNotLoaded(id) => {
                BookingError::Internal(format!("inventory for {} not loaded", id))
            }
        }
    }
}

impl From<LedgerError> for BookingError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound(code) => BookingError::ReservationNotFound(code),
            LedgerError::AlreadyRefunded(code) => BookingError::AlreadyRefunded(code),
            LedgerError::ShowtimeStarted(_) => BookingError::ShowtimeStarted,
            // Retried by the booking flow; only surfaces if that logic is bypassed.
            LedgerError::DuplicateCode(_) => BookingError::CodeGenerationExhausted,
            LedgerError::Storage(msg) => BookingError::Storage(msg),
        }
    }
}

impl From<CatalogError> for BookingError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(id) => BookingError::ShowtimeNotFound(id),
            other => BookingError::Internal(other.to_string()),
        }
    }
}

impl From<CodeError> for BookingError {
    fn from(err: CodeError) -> Self {
        match err {
            CodeError::Exhausted(_) => BookingError::CodeGenerationExhausted,
            CodeError::Ledger(e) => e.into(),
        }
    }
}

impl From<PaymentError> for BookingError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Declined(reason) => BookingError::PaymentDeclined(reason),
            PaymentError::Unavailable(reason) => BookingError::PaymentUnavailable(reason),
        }
    }
}

impl From<CoreError> for BookingError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidCodeFormat(code) => BookingError::InvalidCodeFormat(code),
            CoreError::InvalidSeatLabel(label) => {
                BookingError::InvalidSeatSelection(format!("invalid seat label {}", label))
            }
            other => BookingError::Internal(other.to_string()),
        }
    }
}
