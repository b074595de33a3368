use chrono::{DateTime, Duration, Utc};
use cinema_core::{Clock, HoldToken, SeatId, ShowtimeId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::showtime::{SeatGeometry, Showtime};

/// Public view of a seat's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatStatus {
    Free,
    Held,
    Booked,
}

/// Per-seat state. The holder is the nonce of the hold token that claimed
/// the seat; it stays the holder reference after commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeatState {
    Free,
    Held { holder: Uuid, expires_at: DateTime<Utc> },
    Booked { holder: Uuid },
}

/// Time-limited, exclusive claim on a set of seats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hold {
    pub token: HoldToken,
    /// Canonical (row, number) order.
    pub seats: Vec<SeatId>,
    pub party_size: usize,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Hold {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SeatView {
    pub seat: SeatId,
    pub status: SeatStatus,
}

/// Read-only snapshot of one showtime's seat map.
#[derive(Debug, Clone, Serialize)]
pub struct SeatMapView {
    pub showtime_id: ShowtimeId,
    pub rows: u16,
    pub seats_per_row: u16,
    pub available: usize,
    pub seats: Vec<SeatView>,
}

impl SeatMapView {
    pub fn status_of(&self, seat: &SeatId) -> Option<SeatStatus> {
        self.seats.iter().find(|s| s.seat == *seat).map(|s| s.status)
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum InventoryError {
    #[error("Inventory not loaded for showtime {0}")]
    ShowtimeNotLoaded(ShowtimeId),

    #[error("No seats requested")]
    EmptySelection,

    #[error("Party size mismatch: {seats} seats requested for a party of {party_size}")]
    PartySizeMismatch { seats: usize, party_size: usize },

    #[error("Seat {0} does not exist in this showtime")]
    UnknownSeat(SeatId),

    #[error("Seat {0} requested more than once")]
    DuplicateSeat(SeatId),

    #[error("Seats unavailable: {}", format_seats(.0))]
    SeatUnavailable(Vec<SeatId>),

    /// `released` holds the seats this call moved back to FREE; empty when
    /// an earlier sweep already expired the hold.
    #[error("Hold expired: {token}")]
    HoldExpired { token: HoldToken, released: Vec<SeatId> },

    #[error("Hold not found: {0}")]
    HoldNotFound(HoldToken),
}

fn format_seats(seats: &[SeatId]) -> String {
    seats.iter().map(SeatId::label).collect::<Vec<_>>().join(", ")
}

/// Mutable state of one showtime, guarded by that showtime's mutex.
struct SeatMap {
    geometry: SeatGeometry,
    seats: Vec<SeatState>,
    holds: HashMap<Uuid, Hold>,
    /// Tokens released by expiry, with the instant they lapsed.
    lapsed: HashMap<Uuid, DateTime<Utc>>,
}

impl SeatMap {
    fn new(geometry: SeatGeometry) -> Self {
        Self {
            geometry,
            seats: vec![SeatState::Free; geometry.capacity()],
            holds: HashMap::new(),
            lapsed: HashMap::new(),
        }
    }

    fn state(&self, seat: &SeatId) -> SeatState {
        self.geometry
            .index_of(seat)
            .map(|i| self.seats[i])
            .unwrap_or(SeatState::Free)
    }

    fn set(&mut self, seat: &SeatId, state: SeatState) {
        if let Some(i) = self.geometry.index_of(seat) {
            self.seats[i] = state;
        }
    }

    /// Free every seat still held by `holder`. Seats already re-claimed by
    /// someone else are left alone.
    fn free_held(&mut self, holder: Uuid, seats: &[SeatId]) {
        for seat in seats {
            if matches!(self.state(seat), SeatState::Held { holder: h, .. } if h == holder) {
                self.set(seat, SeatState::Free);
            }
        }
    }

    /// Lapse one hold: seats back to FREE, token remembered as expired.
    fn expire(&mut self, nonce: Uuid, now: DateTime<Utc>) -> Option<Hold> {
        let hold = self.holds.remove(&nonce)?;
        self.free_held(nonce, &hold.seats);
        self.lapsed.insert(nonce, now);
        Some(hold)
    }

    fn sweep(&mut self, now: DateTime<Utc>, ttl: Duration) -> Vec<Hold> {
        let due: Vec<Uuid> = self
            .holds
            .iter()
            .filter(|(_, hold)| hold.is_expired(now))
            .map(|(nonce, _)| *nonce)
            .collect();

        let expired: Vec<Hold> = due
            .into_iter()
            .filter_map(|nonce| self.expire(nonce, now))
            .collect();

        // Tombstones only need to outlive a slow commit by one TTL window.
        self.lapsed.retain(|_, lapsed_at| *lapsed_at + ttl > now);

        expired
    }
}

/// Sole authority over seat state for one showtime.
pub struct ShowtimeInventory {
    showtime_id: ShowtimeId,
    geometry: SeatGeometry,
    hold_ttl: Duration,
    state: Mutex<SeatMap>,
}

impl ShowtimeInventory {
    fn new(showtime_id: ShowtimeId, geometry: SeatGeometry, hold_ttl: Duration) -> Self {
        Self {
            showtime_id,
            geometry,
            hold_ttl,
            state: Mutex::new(SeatMap::new(geometry)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SeatMap> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Checks that need no lock: non-empty, distinct, inside the geometry,
    /// and matching the party size. Returns seats in canonical order.
    fn validate_selection(
        &self,
        seats: &[SeatId],
        party_size: usize,
    ) -> Result<Vec<SeatId>, InventoryError> {
        if seats.is_empty() {
            return Err(InventoryError::EmptySelection);
        }
        if seats.len() != party_size {
            return Err(InventoryError::PartySizeMismatch {
                seats: seats.len(),
                party_size,
            });
        }

        let mut canonical = BTreeSet::new();
        for seat in seats {
            if !self.geometry.contains(seat) {
                return Err(InventoryError::UnknownSeat(*seat));
            }
            if !canonical.insert(*seat) {
                return Err(InventoryError::DuplicateSeat(*seat));
            }
        }

        Ok(canonical.into_iter().collect())
    }

    fn hold(
        &self,
        seats: &[SeatId],
        party_size: usize,
        now: DateTime<Utc>,
    ) -> Result<Hold, InventoryError> {
        let seats = self.validate_selection(seats, party_size)?;

        let mut map = self.lock();
        map.sweep(now, self.hold_ttl);

        // Check-then-set for the whole set under one lock: all or nothing.
        let unavailable: Vec<SeatId> = seats
            .iter()
            .filter(|seat| map.state(seat) != SeatState::Free)
            .copied()
            .collect();
        if !unavailable.is_empty() {
            return Err(InventoryError::SeatUnavailable(unavailable));
        }

        let token = HoldToken::new(self.showtime_id);
        let expires_at = now + self.hold_ttl;
        for seat in &seats {
            map.set(
                seat,
                SeatState::Held {
                    holder: token.nonce,
                    expires_at,
                },
            );
        }

        let hold = Hold {
            token,
            seats,
            party_size,
            created_at: now,
            expires_at,
        };
        map.holds.insert(token.nonce, hold.clone());
        Ok(hold)
    }

    fn commit(&self, token: &HoldToken, now: DateTime<Utc>) -> Result<Vec<SeatId>, InventoryError> {
        let mut map = self.lock();

        let expired = match map.holds.get(&token.nonce) {
            Some(hold) => hold.is_expired(now),
            None if map.lapsed.contains_key(&token.nonce) => {
                return Err(InventoryError::HoldExpired {
                    token: *token,
                    released: Vec::new(),
                })
            }
            None => return Err(InventoryError::HoldNotFound(*token)),
        };
        if expired {
            let released = map.expire(token.nonce, now).map(|hold| hold.seats).unwrap_or_default();
            return Err(InventoryError::HoldExpired {
                token: *token,
                released,
            });
        }

        let hold = map
            .holds
            .remove(&token.nonce)
            .ok_or(InventoryError::HoldNotFound(*token))?;
        for seat in &hold.seats {
            map.set(seat, SeatState::Booked { holder: token.nonce });
        }
        Ok(hold.seats)
    }

    fn release_hold(&self, token: &HoldToken) -> Vec<SeatId> {
        let mut map = self.lock();
        match map.holds.remove(&token.nonce) {
            Some(hold) => {
                map.free_held(token.nonce, &hold.seats);
                hold.seats
            }
            None => Vec::new(),
        }
    }

    fn release_seats(&self, seats: &[SeatId], holder: &HoldToken) -> Vec<SeatId> {
        let mut canonical: Vec<SeatId> = seats.to_vec();
        canonical.sort();
        canonical.dedup();

        let mut map = self.lock();
        let mut released = Vec::new();
        for seat in &canonical {
            let owned = match map.state(seat) {
                SeatState::Held { holder: h, .. } | SeatState::Booked { holder: h } => {
                    h == holder.nonce
                }
                SeatState::Free => false,
            };
            if owned {
                map.set(seat, SeatState::Free);
                released.push(*seat);
            }
        }

        // Keep the hold record consistent if it was released seat by seat.
        let emptied = match map.holds.get_mut(&holder.nonce) {
            Some(hold) => {
                hold.seats.retain(|s| !released.contains(s));
                hold.seats.is_empty()
            }
            None => false,
        };
        if emptied {
            map.holds.remove(&holder.nonce);
        }

        released
    }

    fn restore_booking(&self, holder: Uuid, seats: &[SeatId]) {
        let mut map = self.lock();
        for seat in seats {
            if self.geometry.contains(seat) {
                map.set(seat, SeatState::Booked { holder });
            }
        }
    }

    fn expire_sweep(&self, now: DateTime<Utc>) -> Vec<Hold> {
        self.lock().sweep(now, self.hold_ttl)
    }

    fn snapshot(&self, now: DateTime<Utc>) -> SeatMapView {
        let map = self.lock();
        let seats: Vec<SeatView> = self
            .geometry
            .seats()
            .map(|seat| {
                let status = match map.state(&seat) {
                    SeatState::Free => SeatStatus::Free,
                    // Lapsed but not yet swept reads as free.
                    SeatState::Held { expires_at, .. } if expires_at <= now => SeatStatus::Free,
                    SeatState::Held { .. } => SeatStatus::Held,
                    SeatState::Booked { .. } => SeatStatus::Booked,
                };
                SeatView { seat, status }
            })
            .collect();

        SeatMapView {
            showtime_id: self.showtime_id,
            rows: self.geometry.rows,
            seats_per_row: self.geometry.seats_per_row,
            available: seats.iter().filter(|s| s.status == SeatStatus::Free).count(),
            seats,
        }
    }
}

/// Registry of per-showtime inventories. Each showtime is its own
/// contention domain; the registry lock is only written on registration.
pub struct InventoryManager {
    showtimes: RwLock<HashMap<ShowtimeId, Arc<ShowtimeInventory>>>,
    clock: Arc<dyn Clock>,
    hold_ttl: Duration,
}

impl InventoryManager {
    pub fn new(clock: Arc<dyn Clock>, hold_ttl: Duration) -> Self {
        Self {
            showtimes: RwLock::new(HashMap::new()),
            clock,
            hold_ttl,
        }
    }

    pub fn hold_ttl(&self) -> Duration {
        self.hold_ttl
    }

    pub fn is_loaded(&self, showtime_id: ShowtimeId) -> bool {
        self.showtimes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&showtime_id)
    }

    /// Load a showtime's seat map with its existing bookings (holder nonce
    /// and seats). Returns false if the showtime was already loaded, in
    /// which case `bookings` is ignored.
    pub fn register(&self, showtime: &Showtime, bookings: &[(HoldToken, Vec<SeatId>)]) -> bool {
        let mut showtimes = self.showtimes.write().unwrap_or_else(PoisonError::into_inner);
        if showtimes.contains_key(&showtime.id) {
            return false;
        }

        let inventory = ShowtimeInventory::new(showtime.id, showtime.geometry, self.hold_ttl);
        for (holder, seats) in bookings {
            inventory.restore_booking(holder.nonce, seats);
        }
        showtimes.insert(showtime.id, Arc::new(inventory));

        info!(
            "Inventory loaded for showtime {} ({} seats, {} bookings restored)",
            showtime.id,
            showtime.geometry.capacity(),
            bookings.len()
        );
        true
    }

    fn inventory(&self, showtime_id: ShowtimeId) -> Result<Arc<ShowtimeInventory>, InventoryError> {
        self.showtimes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&showtime_id)
            .cloned()
            .ok_or(InventoryError::ShowtimeNotLoaded(showtime_id))
    }

    /// Atomically move every requested seat FREE→HELD, or none of them.
    pub fn hold(
        &self,
        showtime_id: ShowtimeId,
        seats: &[SeatId],
        party_size: usize,
    ) -> Result<Hold, InventoryError> {
        let inventory = self.inventory(showtime_id)?;
        let hold = inventory.hold(seats, party_size, self.clock.now())?;
        debug!(
            "Hold {} granted on {} seats until {}",
            hold.token,
            hold.seats.len(),
            hold.expires_at
        );
        Ok(hold)
    }

    /// HELD→BOOKED for every seat of the hold; the token is spent.
    pub fn commit(&self, token: &HoldToken) -> Result<Vec<SeatId>, InventoryError> {
        let inventory = self.inventory(token.showtime)?;
        let seats = inventory.commit(token, self.clock.now())?;
        debug!("Hold {} committed", token);
        Ok(seats)
    }

    /// HELD→FREE for an uncommitted hold. Unknown or spent tokens are a no-op.
    pub fn release_hold(&self, token: &HoldToken) -> Vec<SeatId> {
        match self.inventory(token.showtime) {
            Ok(inventory) => inventory.release_hold(token),
            Err(_) => Vec::new(),
        }
    }

    /// HELD/BOOKED→FREE for the given seats, but only those still claimed by
    /// `holder`. Idempotent; returns the seats actually freed.
    pub fn release_seats(
        &self,
        showtime_id: ShowtimeId,
        seats: &[SeatId],
        holder: &HoldToken,
    ) -> Result<Vec<SeatId>, InventoryError> {
        let inventory = self.inventory(showtime_id)?;
        Ok(inventory.release_seats(seats, holder))
    }

    /// Expire every hold whose TTL has elapsed at `now`, across showtimes.
    pub fn expire_sweep(&self, now: DateTime<Utc>) -> Vec<Hold> {
        let inventories: Vec<Arc<ShowtimeInventory>> = self
            .showtimes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        inventories.iter().flat_map(|inventory| inventory.expire_sweep(now)).collect()
    }

    pub fn snapshot(&self, showtime_id: ShowtimeId) -> Result<SeatMapView, InventoryError> {
        Ok(self.inventory(showtime_id)?.snapshot(self.clock.now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::showtime::fixtures;
    use cinema_core::ManualClock;
    use std::sync::Barrier;

    fn seat(label: &str) -> SeatId {
        SeatId::parse(label).unwrap()
    }

    fn setup(rows: u16, seats_per_row: u16) -> (InventoryManager, Arc<ManualClock>, Showtime) {
        let clock = Arc::new(ManualClock::default());
        let manager = InventoryManager::new(clock.clone(), Duration::minutes(5));
        let showtime = fixtures::showtime(rows, seats_per_row);
        assert!(manager.register(&showtime, &[]));
        (manager, clock, showtime)
    }

    #[test]
    fn test_snapshot_wire_format() {
        let (manager, _clock, showtime) = setup(1, 2);
        manager.hold(showtime.id, &[seat("A2")], 1).unwrap();

        let value = serde_json::to_value(manager.snapshot(showtime.id).unwrap()).unwrap();
        assert_eq!(value["available"], 1);
        assert_eq!(
            value["seats"],
            serde_json::json!([
                { "seat": "A1", "status": "FREE" },
                { "seat": "A2", "status": "HELD" },
            ])
        );
    }

    #[test]
    fn test_hold_commit_lifecycle() {
        let (manager, _clock, showtime) = setup(2, 4);

        let hold = manager.hold(showtime.id, &[seat("A2"), seat("A1")], 2).unwrap();
        assert_eq!(hold.seats, vec![seat("A1"), seat("A2")]);
        assert_eq!(
            manager.snapshot(showtime.id).unwrap().status_of(&seat("A1")),
            Some(SeatStatus::Held)
        );

        let committed = manager.commit(&hold.token).unwrap();
        assert_eq!(committed, vec![seat("A1"), seat("A2")]);

        let view = manager.snapshot(showtime.id).unwrap();
        assert_eq!(view.status_of(&seat("A1")), Some(SeatStatus::Booked));
        assert_eq!(view.available, 6);

        // Token is spent
        assert_eq!(manager.commit(&hold.token), Err(InventoryError::HoldNotFound(hold.token)));
    }

    #[test]
    fn test_validation_errors() {
        let (manager, _clock, showtime) = setup(2, 4);

        assert_eq!(manager.hold(showtime.id, &[], 0), Err(InventoryError::EmptySelection));
        assert_eq!(
            manager.hold(showtime.id, &[seat("A1")], 2),
            Err(InventoryError::PartySizeMismatch { seats: 1, party_size: 2 })
        );
        assert_eq!(
            manager.hold(showtime.id, &[seat("C1")], 1),
            Err(InventoryError::UnknownSeat(seat("C1")))
        );
        assert_eq!(
            manager.hold(showtime.id, &[seat("A1"), seat("A1")], 2),
            Err(InventoryError::DuplicateSeat(seat("A1")))
        );

        let unknown = ShowtimeId::new();
        assert_eq!(
            manager.hold(unknown, &[seat("A1")], 1),
            Err(InventoryError::ShowtimeNotLoaded(unknown))
        );

        // Nothing was touched
        assert_eq!(manager.snapshot(showtime.id).unwrap().available, 8);
    }

    #[test]
    fn test_no_partial_holds() {
        let (manager, _clock, showtime) = setup(1, 4);

        manager.hold(showtime.id, &[seat("A3")], 1).unwrap();

        let result = manager.hold(showtime.id, &[seat("A1"), seat("A2"), seat("A3")], 3);
        assert_eq!(result, Err(InventoryError::SeatUnavailable(vec![seat("A3")])));

        let view = manager.snapshot(showtime.id).unwrap();
        assert_eq!(view.status_of(&seat("A1")), Some(SeatStatus::Free));
        assert_eq!(view.status_of(&seat("A2")), Some(SeatStatus::Free));
    }

    #[test]
    fn test_hold_expiry() {
        let (manager, clock, showtime) = setup(1, 2);

        let hold = manager.hold(showtime.id, &[seat("A1")], 1).unwrap();
        assert!(manager.hold(showtime.id, &[seat("A1")], 1).is_err());

        clock.advance(Duration::minutes(5) + Duration::seconds(1));

        // Reads free before any sweep ran
        assert_eq!(
            manager.snapshot(showtime.id).unwrap().status_of(&seat("A1")),
            Some(SeatStatus::Free)
        );

        // And a different request can take it
        let second = manager.hold(showtime.id, &[seat("A1")], 1).unwrap();
        assert_ne!(second.token, hold.token);

        // The lapsed token reports expiry, not absence; the swept seats are
        // not reported again.
        assert_eq!(
            manager.commit(&hold.token),
            Err(InventoryError::HoldExpired {
                token: hold.token,
                released: Vec::new(),
            })
        );
    }

    #[test]
    fn test_commit_after_ttl_is_expired() {
        let (manager, clock, showtime) = setup(1, 2);

        let hold = manager.hold(showtime.id, &[seat("A1"), seat("A2")], 2).unwrap();
        clock.advance(Duration::minutes(5));

        assert_eq!(
            manager.commit(&hold.token),
            Err(InventoryError::HoldExpired {
                token: hold.token,
                released: vec![seat("A1"), seat("A2")],
            })
        );
        assert_eq!(manager.snapshot(showtime.id).unwrap().available, 2);
    }

    #[test]
    fn test_expire_sweep() {
        let (manager, clock, showtime) = setup(1, 3);

        manager.hold(showtime.id, &[seat("A1")], 1).unwrap();
        clock.advance(Duration::minutes(3));
        let fresh = manager.hold(showtime.id, &[seat("A2")], 1).unwrap();
        clock.advance(Duration::minutes(3));

        let expired = manager.expire_sweep(clock.now());
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].seats, vec![seat("A1")]);

        let view = manager.snapshot(showtime.id).unwrap();
        assert_eq!(view.status_of(&seat("A1")), Some(SeatStatus::Free));
        assert_eq!(view.status_of(&seat("A2")), Some(SeatStatus::Held));

        assert!(manager.commit(&fresh.token).is_ok());
    }

    #[test]
    fn test_release_is_idempotent_and_holder_scoped() {
        let (manager, _clock, showtime) = setup(1, 2);

        let first = manager.hold(showtime.id, &[seat("A1")], 1).unwrap();
        manager.commit(&first.token).unwrap();

        let released = manager.release_seats(showtime.id, &[seat("A1")], &first.token).unwrap();
        assert_eq!(released, vec![seat("A1")]);

        // Someone else books the seat
        let second = manager.hold(showtime.id, &[seat("A1")], 1).unwrap();
        manager.commit(&second.token).unwrap();

        // Replaying the first release must not free the new booking
        let released = manager.release_seats(showtime.id, &[seat("A1")], &first.token).unwrap();
        assert!(released.is_empty());
        assert_eq!(
            manager.snapshot(showtime.id).unwrap().status_of(&seat("A1")),
            Some(SeatStatus::Booked)
        );
    }

    #[test]
    fn test_release_hold() {
        let (manager, _clock, showtime) = setup(1, 2);

        let hold = manager.hold(showtime.id, &[seat("A1"), seat("A2")], 2).unwrap();
        assert_eq!(manager.release_hold(&hold.token).len(), 2);
        assert!(manager.release_hold(&hold.token).is_empty());
        assert_eq!(manager.commit(&hold.token), Err(InventoryError::HoldNotFound(hold.token)));
        assert_eq!(manager.snapshot(showtime.id).unwrap().available, 2);
    }

    #[test]
    fn test_register_restores_bookings() {
        let clock = Arc::new(ManualClock::default());
        let manager = InventoryManager::new(clock, Duration::minutes(5));
        let showtime = fixtures::showtime(1, 3);
        let booking = HoldToken::new(showtime.id);

        assert!(manager.register(&showtime, &[(booking, vec![seat("A2")])]));
        assert!(!manager.register(&showtime, &[]));

        assert_eq!(
            manager.hold(showtime.id, &[seat("A2")], 1),
            Err(InventoryError::SeatUnavailable(vec![seat("A2")]))
        );
        assert_eq!(
            manager.release_seats(showtime.id, &[seat("A2")], &booking).unwrap(),
            vec![seat("A2")]
        );
    }

    #[test]
    fn test_concurrent_identical_holds_exactly_one_wins() {
        let (manager, _clock, showtime) = setup(1, 4);
        let requested = [seat("A1"), seat("A2"), seat("A3")];
        let contenders = 16;
        let barrier = Barrier::new(contenders);

        let results: Vec<Result<Hold, InventoryError>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..contenders)
                .map(|i| {
                    let manager = &manager;
                    let barrier = &barrier;
                    // Same set, different request orders
                    let mut seats = requested.to_vec();
                    seats.rotate_left(i % 3);
                    scope.spawn(move || {
                        barrier.wait();
                        manager.hold(showtime.id, &seats, 3)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let wins = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(InventoryError::SeatUnavailable(_))))
            .count();
        assert_eq!(wins, 1);
        assert_eq!(conflicts, contenders - 1);
    }

    #[test]
    fn test_concurrent_disjoint_holds_all_succeed() {
        let (manager, _clock, showtime) = setup(4, 10);

        let results: Vec<bool> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4u16)
                .map(|row| {
                    let manager = &manager;
                    scope.spawn(move || {
                        let seats: Vec<SeatId> = (1..=10).map(|n| SeatId::new(row, n)).collect();
                        manager.hold(showtime.id, &seats, 10).is_ok()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(results.into_iter().all(|ok| ok));
        assert_eq!(manager.snapshot(showtime.id).unwrap().available, 0);
    }
}
