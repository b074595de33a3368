use chrono::{DateTime, Utc};
use cinema_core::{HoldToken, ReservationCode, SeatId, ShowtimeId};
use cinema_shared::Masked;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Reservation status in the ledger
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Active,
    Refunded,
}

/// A completed booking. Created on commit, only ever mutated by refund,
/// never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reservation {
    pub code: ReservationCode,
    pub showtime_id: ShowtimeId,
    /// Canonical order; `seats.len() == party_size`.
    pub seats: Vec<SeatId>,
    pub party_size: usize,
    pub total_amount: i64,
    pub currency: String,
    pub status: ReservationStatus,
    /// Hold token that committed the seats; holder reference while BOOKED.
    pub booking_ref: HoldToken,
    pub authorization_id: Option<String>,
    /// Copied from the showtime for the no-refund-after-start rule.
    pub starts_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub refunded_at: Option<DateTime<Utc>>,
}

impl Reservation {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        code: ReservationCode,
        showtime_id: ShowtimeId,
        seats: Vec<SeatId>,
        total_amount: i64,
        currency: String,
        booking_ref: HoldToken,
        authorization_id: Option<String>,
        starts_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            code,
            showtime_id,
            party_size: seats.len(),
            seats,
            total_amount,
            currency,
            status: ReservationStatus::Active,
            booking_ref,
            authorization_id,
            starts_at,
            created_at,
            refunded_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ReservationStatus::Active
    }

    /// Mark as refunded (never delete)
    pub fn refund(&mut self, at: DateTime<Utc>) {
        self.status = ReservationStatus::Refunded;
        self.refunded_at = Some(at);
    }
}

/// Input to the booking flow.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub showtime_id: ShowtimeId,
    pub seats: Vec<SeatId>,
    pub party_size: usize,
    pub payment_method: Masked<String>,
}

/// What a successful booking hands back to the caller.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BookingReceipt {
    pub code: ReservationCode,
    pub showtime_id: ShowtimeId,
    pub seats: Vec<SeatId>,
    pub total_amount: i64,
    pub currency: String,
}

impl From<&Reservation> for BookingReceipt {
    fn from(reservation: &Reservation) -> Self {
        Self {
            code: reservation.code.clone(),
            showtime_id: reservation.showtime_id,
            seats: reservation.seats.clone(),
            total_amount: reservation.total_amount,
            currency: reservation.currency.clone(),
        }
    }
}

/// States of one booking attempt.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingState {
    Requested,
    Held,
    Authorizing,
    Committed,
    AuthorizationFailed,
    Expired,
    Released,
}

impl BookingState {
    pub fn can_transition_to(self, next: BookingState) -> bool {
        use BookingState::*;
        matches!(
            (self, next),
            (Requested, Held)
                | (Held, Authorizing)
                | (Held, Expired)
                | (Authorizing, Committed)
                | (Authorizing, AuthorizationFailed)
                // Hold lapsed while the provider was still deciding
                | (Authorizing, Expired)
                // Seats committed but the reservation could not be recorded
                | (Authorizing, Released)
                | (AuthorizationFailed, Released)
                | (Expired, Released)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BookingState::Committed | BookingState::Released)
    }
}

/// Tracks one pass through the booking state machine.
#[derive(Debug, Clone)]
pub struct BookingAttempt {
    pub id: Uuid,
    pub showtime_id: ShowtimeId,
    pub state: BookingState,
    pub history: Vec<(BookingState, DateTime<Utc>)>,
}

impl BookingAttempt {
    pub fn new(showtime_id: ShowtimeId, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            showtime_id,
            state: BookingState::Requested,
            history: vec![(BookingState::Requested, at)],
        }
    }

    /// Move to `next`, returning the rejected pair on an illegal transition.
    pub fn advance(
        &mut self,
        next: BookingState,
        at: DateTime<Utc>,
    ) -> Result<(), (BookingState, BookingState)> {
        if !self.state.can_transition_to(next) {
            return Err((self.state, next));
        }
        debug!("Booking {} {:?} -> {:?}", self.id, self.state, next);
        self.state = next;
        self.history.push((next, at));
        Ok(())
    }
}
