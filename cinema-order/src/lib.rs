pub mod booking;
pub mod codes;
pub mod error;
pub mod ledger;
pub mod models;
pub mod payment;

pub use booking::{BookingConfig, BookingService};
pub use codes::{CodeError, CodeGenerator};
pub use error::BookingError;
pub use ledger::{InMemoryLedger, LedgerError, ReservationRepository};
pub use models::{
    BookingAttempt, BookingReceipt, BookingRequest, BookingState, Reservation, ReservationStatus,
};
pub use payment::MockPaymentGateway;
