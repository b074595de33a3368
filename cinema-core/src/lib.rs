pub mod clock;
pub mod code;
pub mod ids;
pub mod payment;

pub use clock::{Clock, ManualClock, SystemClock};
pub use code::ReservationCode;
pub use ids::{HoldToken, SeatId, ShowtimeId, MAX_ROWS};

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid seat label: {0}")]
    InvalidSeatLabel(String),
    #[error("Invalid reservation code format: {0}")]
    InvalidCodeFormat(String),
    #[error("Invalid hold token: {0}")]
    InvalidHoldToken(String),
    #[error("Invalid showtime id: {0}")]
    InvalidShowtimeId(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
