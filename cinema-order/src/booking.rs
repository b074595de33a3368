use cinema_catalog::{
    Hold, InventoryError, InventoryManager, SeatMapView, Showtime, ShowtimeCatalog,
};
use cinema_core::payment::{Authorization, PaymentError, PaymentGateway, PaymentRequest};
use cinema_core::{Clock, HoldToken, ReservationCode, SeatId, ShowtimeId};
use cinema_shared::{SeatChangeKind, SeatsChangedEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::codes::CodeGenerator;
use crate::error::BookingError;
use crate::ledger::{LedgerError, ReservationRepository};
use crate::models::{BookingAttempt, BookingReceipt, BookingRequest, BookingState, Reservation};

#[derive(Debug, Clone)]
pub struct BookingConfig {
    /// Upper bound on code draws, and on inserts retried after `DuplicateCode`.
    pub code_attempts: u32,
    pub payment_timeout: Duration,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            code_attempts: 8,
            payment_timeout: Duration::from_secs(30),
        }
    }
}

/// Orchestrates hold → payment authorization → commit, and refunds.
///
/// Seat state is only ever changed through the [`InventoryManager`] and
/// reservation status only through the [`ReservationRepository`].
pub struct BookingService {
    inventory: Arc<InventoryManager>,
    catalog: Arc<dyn ShowtimeCatalog>,
    ledger: Arc<dyn ReservationRepository>,
    payments: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
    codes: CodeGenerator,
    config: BookingConfig,
    events: Option<broadcast::Sender<SeatsChangedEvent>>,
}

impl BookingService {
    pub fn new(
        inventory: Arc<InventoryManager>,
        catalog: Arc<dyn ShowtimeCatalog>,
        ledger: Arc<dyn ReservationRepository>,
        payments: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
        config: BookingConfig,
    ) -> Self {
        Self {
            inventory,
            catalog,
            ledger,
            payments,
            clock,
            codes: CodeGenerator::new(config.code_attempts),
            config,
            events: None,
        }
    }

    /// Publish seat changes on this channel.
    pub fn with_events(mut self, events: broadcast::Sender<SeatsChangedEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Book `request.seats`, returning the issued reservation code.
    pub async fn book(&self, request: BookingRequest) -> Result<BookingReceipt, BookingError> {
        // Validation before any shared state is touched
        if request.seats.is_empty() {
            return Err(BookingError::InvalidSeatSelection("no seats requested".to_string()));
        }
        if request.seats.len() != request.party_size {
            return Err(BookingError::PartySizeMismatch {
                seats: request.seats.len(),
                party_size: request.party_size,
            });
        }

        let showtime = self.catalog.get_showtime(request.showtime_id).await?;
        if showtime.has_started(self.clock.now()) {
            return Err(BookingError::ShowtimeStarted);
        }
        let amount = showtime
            .total_price(request.party_size)
            .ok_or_else(|| {
                BookingError::InvalidSeatSelection("total amount out of range".to_string())
            })?;

        self.ensure_loaded(&showtime).await?;

        let mut attempt = BookingAttempt::new(showtime.id, self.clock.now());
        let hold = self.inventory.hold(showtime.id, &request.seats, request.party_size)?;
        self.advance(&mut attempt, BookingState::Held)?;
        self.publish(showtime.id, &hold.seats, SeatChangeKind::Held);

        self.advance(&mut attempt, BookingState::Authorizing)?;
        let authorization = match self.authorize(&attempt, &showtime, amount, &request).await {
            Ok(authorization) => authorization,
            Err(e) => {
                warn!("Booking {} payment failed: {}", attempt.id, e);
                self.advance(&mut attempt, BookingState::AuthorizationFailed)?;
                let released = self.inventory.release_hold(&hold.token);
                self.advance(&mut attempt, BookingState::Released)?;
                self.publish(showtime.id, &released, SeatChangeKind::Released);
                return Err(e.into());
            }
        };

        let seats = match self.inventory.commit(&hold.token) {
            Ok(seats) => seats,
            Err(InventoryError::HoldExpired { released, .. }) => {
                // Expiry already freed the seats; nothing to release. Only
                // seats freed by this commit are announced, a sweep has
                // published the rest and they may be rebooked since.
                warn!("Booking {} hold {} expired during authorization", attempt.id, hold.token);
                self.advance(&mut attempt, BookingState::Expired)?;
                self.void(&authorization).await;
                self.advance(&mut attempt, BookingState::Released)?;
                self.publish(showtime.id, &released, SeatChangeKind::Expired);
                return Err(BookingError::HoldExpired);
            }
            Err(e) => {
                error!("Booking {} commit failed: {}", attempt.id, e);
                self.void(&authorization).await;
                return Err(e.into());
            }
        };

        let reservation = match self.record(&showtime, &hold, seats, amount, &authorization).await {
            Ok(reservation) => reservation,
            Err(e) => {
                // BOOKED seats must always belong to an ACTIVE reservation.
                error!("Booking {} could not be recorded, rolling back seats: {}", attempt.id, e);
                let released = self
                    .inventory
                    .release_seats(showtime.id, &hold.seats, &hold.token)
                    .unwrap_or_default();
                self.void(&authorization).await;
                self.advance(&mut attempt, BookingState::Released)?;
                self.publish(showtime.id, &released, SeatChangeKind::Released);
                return Err(e);
            }
        };

        self.advance(&mut attempt, BookingState::Committed)?;
        self.publish(showtime.id, &reservation.seats, SeatChangeKind::Booked);
        info!(
            "Booking {} confirmed: reservation {} for {} seats on {}",
            attempt.id, reservation.code, reservation.party_size, showtime.id
        );

        Ok(BookingReceipt::from(&reservation))
    }

    /// Look up a reservation by its presented code.
    pub async fn get_reservation(&self, code: &str) -> Result<Reservation, BookingError> {
        let code = ReservationCode::parse(code)?;
        Ok(self.ledger.find(&code).await?)
    }

    /// Release the reservation's seats, then mark it REFUNDED.
    ///
    /// Safe to re-run after a crash between the two steps: the release only
    /// frees seats still held by this reservation's booking reference.
    pub async fn refund(&self, code: &str) -> Result<Reservation, BookingError> {
        let code = ReservationCode::parse(code)?;
        let reservation = self.ledger.find(&code).await?;

        let now = self.clock.now();
        crate::ledger::check_refundable(&reservation, now)?;

        let showtime = self.catalog.get_showtime(reservation.showtime_id).await?;
        self.ensure_loaded(&showtime).await?;

        let released = self
            .inventory
            .release_seats(reservation.showtime_id, &reservation.seats, &reservation.booking_ref)?;

        let refunded = self.ledger.mark_refunded(&code, now).await?;
        self.publish(reservation.showtime_id, &released, SeatChangeKind::Released);
        info!("Reservation {} refunded, {} seats released", code, released.len());

        Ok(refunded)
    }

    pub async fn list_reservations(
        &self,
        showtime_id: ShowtimeId,
    ) -> Result<Vec<Reservation>, BookingError> {
        // Surface unknown showtimes as such rather than as an empty list.
        self.catalog.get_showtime(showtime_id).await?;
        Ok(self.ledger.list_by_showtime(showtime_id).await?)
    }

    pub async fn seat_map(&self, showtime_id: ShowtimeId) -> Result<SeatMapView, BookingError> {
        let showtime = self.catalog.get_showtime(showtime_id).await?;
        self.ensure_loaded(&showtime).await?;
        Ok(self.inventory.snapshot(showtime_id)?)
    }

    /// Expire lapsed holds on every loaded showtime.
    pub fn sweep_expired_holds(&self) -> usize {
        let expired = self.inventory.expire_sweep(self.clock.now());
        for hold in &expired {
            info!("Hold {} expired, {} seats released", hold.token, hold.seats.len());
            self.publish(hold.token.showtime, &hold.seats, SeatChangeKind::Expired);
        }
        expired.len()
    }

    /// Load a showtime's inventory, restoring seats of ACTIVE reservations.
    async fn ensure_loaded(&self, showtime: &Showtime) -> Result<(), BookingError> {
        if self.inventory.is_loaded(showtime.id) {
            return Ok(());
        }

        let bookings: Vec<(HoldToken, Vec<SeatId>)> = self
            .ledger
            .list_by_showtime(showtime.id)
            .await?
            .into_iter()
            .filter(Reservation::is_active)
            .map(|r| (r.booking_ref, r.seats))
            .collect();

        self.inventory.register(showtime, &bookings);
        Ok(())
    }

    async fn authorize(
        &self,
        attempt: &BookingAttempt,
        showtime: &Showtime,
        amount: i64,
        request: &BookingRequest,
    ) -> Result<Authorization, PaymentError> {
        let payment = PaymentRequest {
            reference: attempt.id,
            amount,
            currency: showtime.currency.clone(),
            method: request.payment_method.clone(),
        };

        let authorize = self.payments.authorize(&payment);
        match tokio::time::timeout(self.config.payment_timeout, authorize).await {
            Ok(result) => result,
            Err(_) => Err(PaymentError::Unavailable(format!(
                "no answer within {}s",
                self.config.payment_timeout.as_secs()
            ))),
        }
    }

    /// Best effort; a failed void is logged, never surfaced.
    async fn void(&self, authorization: &Authorization) {
        if let Err(e) = self.payments.void(&authorization.id).await {
            error!("Failed to void authorization {}: {}", authorization.id, e);
        }
    }

    /// Issue a fresh code and insert the reservation, retrying on a
    /// `DuplicateCode` race with a concurrent insert.
    async fn record(
        &self,
        showtime: &Showtime,
        hold: &Hold,
        seats: Vec<SeatId>,
        amount: i64,
        authorization: &Authorization,
    ) -> Result<Reservation, BookingError> {
        for attempt in 1..=self.config.code_attempts.max(1) {
            let code = self.codes.generate(self.ledger.as_ref()).await?;
            let reservation = Reservation::new(
                code,
                showtime.id,
                seats.clone(),
                amount,
                showtime.currency.clone(),
                hold.token,
                Some(authorization.id.clone()),
                showtime.starts_at,
                self.clock.now(),
            );

            match self.ledger.insert(&reservation).await {
                Ok(()) => return Ok(reservation),
                Err(LedgerError::DuplicateCode(code)) => {
                    warn!("Duplicate reservation code {} on insert attempt {}", code, attempt);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(BookingError::CodeGenerationExhausted)
    }

    fn advance(
        &self,
        attempt: &mut BookingAttempt,
        next: BookingState,
    ) -> Result<(), BookingError> {
        attempt.advance(next, self.clock.now()).map_err(|(from, to)| {
            BookingError::Internal(format!("illegal booking transition {:?} -> {:?}", from, to))
        })
    }

    fn publish(&self, showtime_id: ShowtimeId, seats: &[SeatId], kind: SeatChangeKind) {
        if seats.is_empty() {
            return;
        }
        if let Some(events) = &self.events {
            let event = SeatsChangedEvent::new(
                showtime_id.as_uuid(),
                seats.iter().map(SeatId::label).collect(),
                kind,
                self.clock.now().timestamp(),
            );
            // No subscribers is fine.
            let _ = events.send(event);
        }
    }
}
