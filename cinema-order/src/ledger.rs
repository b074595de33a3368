use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cinema_core::{ReservationCode, ShowtimeId};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

use crate::models::{Reservation, ReservationStatus};

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Reservation not found: {0}")]
    NotFound(ReservationCode),

    #[error("Reservation code already issued: {0}")]
    DuplicateCode(ReservationCode),

    #[error("Reservation already refunded: {0}")]
    AlreadyRefunded(ReservationCode),

    #[error("Showtime already started for reservation {0}")]
    ShowtimeStarted(ReservationCode),

    #[error("Ledger storage error: {0}")]
    Storage(String),
}

/// Durable store of reservations, indexed by code. The single writer of
/// reservation status.
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Atomic check-and-insert; `DuplicateCode` if the code exists.
    async fn insert(&self, reservation: &Reservation) -> Result<(), LedgerError>;

    async fn find(&self, code: &ReservationCode) -> Result<Reservation, LedgerError>;

    async fn exists(&self, code: &ReservationCode) -> Result<bool, LedgerError>;

    /// ACTIVE → REFUNDED, unless already refunded or the showtime started.
    async fn mark_refunded(
        &self,
        code: &ReservationCode,
        now: DateTime<Utc>,
    ) -> Result<Reservation, LedgerError>;

    /// Every reservation of a showtime (both statuses), oldest first.
    async fn list_by_showtime(
        &self,
        showtime_id: ShowtimeId,
    ) -> Result<Vec<Reservation>, LedgerError>;
}

/// Check the refund rules against the current record.
pub fn check_refundable(reservation: &Reservation, now: DateTime<Utc>) -> Result<(), LedgerError> {
    if reservation.status == ReservationStatus::Refunded {
        return Err(LedgerError::AlreadyRefunded(reservation.code.clone()));
    }
    if now >= reservation.starts_at {
        return Err(LedgerError::ShowtimeStarted(reservation.code.clone()));
    }
    Ok(())
}

/// In-process ledger; every mutation happens under one write lock.
#[derive(Default)]
pub struct InMemoryLedger {
    reservations: RwLock<HashMap<ReservationCode, Reservation>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.reservations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.reservations.read().await.is_empty()
    }
}

#[async_trait]
impl ReservationRepository for InMemoryLedger {
    async fn insert(&self, reservation: &Reservation) -> Result<(), LedgerError> {
        let mut reservations = self.reservations.write().await;
        if reservations.contains_key(&reservation.code) {
            return Err(LedgerError::DuplicateCode(reservation.code.clone()));
        }
        reservations.insert(reservation.code.clone(), reservation.clone());
        info!("Reservation recorded: {} ({} seats)", reservation.code, reservation.party_size);
        Ok(())
    }

    async fn find(&self, code: &ReservationCode) -> Result<Reservation, LedgerError> {
        self.reservations
            .read()
            .await
            .get(code)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(code.clone()))
    }

    async fn exists(&self, code: &ReservationCode) -> Result<bool, LedgerError> {
        Ok(self.reservations.read().await.contains_key(code))
    }

    async fn mark_refunded(
        &self,
        code: &ReservationCode,
        now: DateTime<Utc>,
    ) -> Result<Reservation, LedgerError> {
        let mut reservations = self.reservations.write().await;
        let reservation = reservations
            .get_mut(code)
            .ok_or_else(|| LedgerError::NotFound(code.clone()))?;

        check_refundable(reservation, now)?;
        reservation.refund(now);
        info!("Reservation refunded: {}", code);
        Ok(reservation.clone())
    }

    async fn list_by_showtime(
        &self,
        showtime_id: ShowtimeId,
    ) -> Result<Vec<Reservation>, LedgerError> {
        let mut found: Vec<Reservation> = self
            .reservations
            .read()
            .await
            .values()
            .filter(|r| r.showtime_id == showtime_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.code.cmp(&b.code)));
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use cinema_core::{HoldToken, SeatId};

    fn reservation(code: &str, showtime_id: ShowtimeId, starts_at: DateTime<Utc>) -> Reservation {
        Reservation::new(
            ReservationCode::parse(code).unwrap(),
            showtime_id,
            vec![SeatId::new(0, 1)],
            12_000,
            "KRW".to_string(),
            HoldToken::new(showtime_id),
            Some("mock_auth_1".to_string()),
            starts_at,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let ledger = InMemoryLedger::new();
        let showtime_id = ShowtimeId::new();
        let record =
            reservation("0607-1234-5678-910", showtime_id, Utc::now() + Duration::hours(2));

        ledger.insert(&record).await.unwrap();
        assert_eq!(ledger.find(&record.code).await.unwrap(), record);
        assert!(ledger.exists(&record.code).await.unwrap());

        let duplicate = ledger.insert(&record).await;
        assert_eq!(duplicate, Err(LedgerError::DuplicateCode(record.code.clone())));
        assert_eq!(ledger.len().await, 1);

        let missing = ReservationCode::parse("0000-0000-0000-000").unwrap();
        assert_eq!(ledger.find(&missing).await, Err(LedgerError::NotFound(missing)));
    }

    #[tokio::test]
    async fn test_mark_refunded_rules() {
        let ledger = InMemoryLedger::new();
        let showtime_id = ShowtimeId::new();
        let now = Utc::now();
        let record = reservation("1111-2222-3333-444", showtime_id, now + Duration::hours(2));
        ledger.insert(&record).await.unwrap();

        let refunded = ledger.mark_refunded(&record.code, now).await.unwrap();
        assert_eq!(refunded.status, ReservationStatus::Refunded);

        // Not silently repeatable
        assert_eq!(
            ledger.mark_refunded(&record.code, now).await,
            Err(LedgerError::AlreadyRefunded(record.code.clone()))
        );

        // Still there for the audit trail
        assert_eq!(ledger.find(&record.code).await.unwrap().status, ReservationStatus::Refunded);
    }

    #[tokio::test]
    async fn test_no_refund_after_start() {
        let ledger = InMemoryLedger::new();
        let now = Utc::now();
        let record =
            reservation("1111-2222-3333-445", ShowtimeId::new(), now - Duration::minutes(1));
        ledger.insert(&record).await.unwrap();

        assert_eq!(
            ledger.mark_refunded(&record.code, now).await,
            Err(LedgerError::ShowtimeStarted(record.code.clone()))
        );
        assert!(ledger.find(&record.code).await.unwrap().is_active());
    }

    #[tokio::test]
    async fn test_concurrent_inserts_same_code() {
        let ledger = std::sync::Arc::new(InMemoryLedger::new());
        let showtime_id = ShowtimeId::new();
        let starts_at = Utc::now() + Duration::hours(1);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = ledger.clone();
                let record = reservation("9999-8888-7777-666", showtime_id, starts_at);
                tokio::spawn(async move { ledger.insert(&record).await })
            })
            .collect();

        let mut ok = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 1);
    }

    #[tokio::test]
    async fn test_list_by_showtime() {
        let ledger = InMemoryLedger::new();
        let showtime_id = ShowtimeId::new();
        let starts_at = Utc::now() + Duration::hours(1);

        ledger.insert(&reservation("0000-0000-0000-001", showtime_id, starts_at)).await.unwrap();
        ledger.insert(&reservation("0000-0000-0000-002", showtime_id, starts_at)).await.unwrap();
        let other = ShowtimeId::new();
        ledger.insert(&reservation("0000-0000-0000-003", other, starts_at)).await.unwrap();

        assert_eq!(ledger.list_by_showtime(showtime_id).await.unwrap().len(), 2);
    }
}
