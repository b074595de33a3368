pub mod models;
pub mod pii;

pub use models::events::{SeatChangeKind, SeatsChangedEvent};
pub use pii::Masked;
