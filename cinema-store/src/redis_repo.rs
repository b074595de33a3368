use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cinema_core::{ReservationCode, ShowtimeId};
use cinema_order::ledger::{check_refundable, LedgerError, ReservationRepository};
use cinema_order::Reservation;
use redis::AsyncCommands;
use tracing::{info, warn};

/// Atomic check-and-insert plus the per-showtime index.
const INSERT_SCRIPT: &str = r#"
    if redis.call("EXISTS", KEYS[1]) == 1 then
        return 0
    end
    redis.call("SET", KEYS[1], ARGV[1])
    redis.call("SADD", KEYS[2], ARGV[2])
    return 1
"#;

/// Replace a record only if nobody changed it since it was read.
const COMPARE_AND_SET_SCRIPT: &str = r#"
    if redis.call("GET", KEYS[1]) == ARGV[1] then
        redis.call("SET", KEYS[1], ARGV[2])
        return 1
    end
    return 0
"#;

const MAX_CAS_ATTEMPTS: usize = 5;

/// Reservation ledger kept in Redis as one JSON document per code.
#[derive(Clone)]
pub struct RedisReservationRepository {
    client: redis::Client,
    prefix: String,
    insert: redis::Script,
    compare_and_set: redis::Script,
}

impl RedisReservationRepository {
    pub async fn new(connection_string: &str, prefix: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        // Fail at startup rather than on the first booking.
        let mut conn = client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        info!("Connected to Redis ledger at {}", connection_string);

        Ok(Self {
            client,
            prefix: prefix.to_string(),
            insert: redis::Script::new(INSERT_SCRIPT),
            compare_and_set: redis::Script::new(COMPARE_AND_SET_SCRIPT),
        })
    }

    fn reservation_key(&self, code: &ReservationCode) -> String {
        format!("{}:reservation:{}", self.prefix, code)
    }

    fn showtime_index_key(&self, showtime_id: ShowtimeId) -> String {
        format!("{}:showtime:{}:reservations", self.prefix, showtime_id)
    }

    async fn conn(&self) -> Result<redis::aio::MultiplexedConnection, LedgerError> {
        self.client.get_multiplexed_async_connection().await.map_err(storage)
    }

    async fn load(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        code: &ReservationCode,
    ) -> Result<Option<(String, Reservation)>, LedgerError> {
        let raw: Option<String> = conn.get(self.reservation_key(code)).await.map_err(storage)?;
        match raw {
            Some(raw) => {
                let reservation = serde_json::from_str(&raw).map_err(storage)?;
                Ok(Some((raw, reservation)))
            }
            None => Ok(None),
        }
    }
}

fn storage(err: impl std::fmt::Display) -> LedgerError {
    LedgerError::Storage(err.to_string())
}

#[async_trait]
impl ReservationRepository for RedisReservationRepository {
    async fn insert(&self, reservation: &Reservation) -> Result<(), LedgerError> {
        let mut conn = self.conn().await?;
        let json = serde_json::to_string(reservation).map_err(storage)?;

        let inserted: i32 = self
            .insert
            .key(self.reservation_key(&reservation.code))
            .key(self.showtime_index_key(reservation.showtime_id))
            .arg(json)
            .arg(reservation.code.as_str())
            .invoke_async(&mut conn)
            .await
            .map_err(storage)?;

        if inserted == 0 {
            return Err(LedgerError::DuplicateCode(reservation.code.clone()));
        }
        info!("Reservation stored: {}", reservation.code);
        Ok(())
    }

    async fn find(&self, code: &ReservationCode) -> Result<Reservation, LedgerError> {
        let mut conn = self.conn().await?;
        self.load(&mut conn, code)
            .await?
            .map(|(_, reservation)| reservation)
            .ok_or_else(|| LedgerError::NotFound(code.clone()))
    }

    async fn exists(&self, code: &ReservationCode) -> Result<bool, LedgerError> {
        let mut conn = self.conn().await?;
        conn.exists(self.reservation_key(code)).await.map_err(storage)
    }

    async fn mark_refunded(
        &self,
        code: &ReservationCode,
        now: DateTime<Utc>,
    ) -> Result<Reservation, LedgerError> {
        let mut conn = self.conn().await?;

        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let (raw, mut reservation) = self
                .load(&mut conn, code)
                .await?
                .ok_or_else(|| LedgerError::NotFound(code.clone()))?;
            check_refundable(&reservation, now)?;

            reservation.refund(now);
            let updated = serde_json::to_string(&reservation).map_err(storage)?;

            let swapped: i32 = self
                .compare_and_set
                .key(self.reservation_key(code))
                .arg(raw)
                .arg(updated)
                .invoke_async(&mut conn)
                .await
                .map_err(storage)?;

            if swapped == 1 {
                info!("Reservation refunded: {}", code);
                return Ok(reservation);
            }
            warn!("Concurrent update on reservation {}, attempt {}", code, attempt);
        }

        Err(LedgerError::Storage(format!("reservation {} kept changing during refund", code)))
    }

    async fn list_by_showtime(
        &self,
        showtime_id: ShowtimeId,
    ) -> Result<Vec<Reservation>, LedgerError> {
        let mut conn = self.conn().await?;
        let codes: Vec<String> = conn
            .smembers(self.showtime_index_key(showtime_id))
            .await
            .map_err(storage)?;
        if codes.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = codes
            .iter()
            .map(|code| format!("{}:reservation:{}", self.prefix, code))
            .collect();
        let docs: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await
            .map_err(storage)?;

        let mut reservations = docs
            .into_iter()
            .flatten()
            .map(|raw| serde_json::from_str::<Reservation>(&raw).map_err(storage))
            .collect::<Result<Vec<_>, _>>()?;
        reservations.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.code.cmp(&b.code))
        });
        Ok(reservations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use cinema_core::{HoldToken, SeatId};

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string())
    }

    fn reservation(showtime_id: ShowtimeId, code: &str) -> Reservation {
        let now = Utc::now();
        Reservation::new(
            ReservationCode::parse(code).unwrap(),
            showtime_id,
            vec![SeatId::new(0, 1), SeatId::new(0, 2)],
            24_000,
            "KRW".to_string(),
            HoldToken::new(showtime_id),
            Some("mock_auth_1".to_string()),
            now + Duration::hours(2),
            now,
        )
    }

    fn random_code() -> String {
        let digits: String = uuid::Uuid::new_v4()
            .as_u128()
            .to_string()
            .chars()
            .take(15)
            .collect();
        format!("{}-{}-{}-{}", &digits[0..4], &digits[4..8], &digits[8..12], &digits[12..15])
    }

    #[test]
    fn test_key_layout() {
        let repo = RedisReservationRepository {
            client: redis::Client::open("redis://127.0.0.1/").unwrap(),
            prefix: "cinema".to_string(),
            insert: redis::Script::new(INSERT_SCRIPT),
            compare_and_set: redis::Script::new(COMPARE_AND_SET_SCRIPT),
        };
        let code = ReservationCode::parse("0607-1234-5678-910").unwrap();
        assert_eq!(repo.reservation_key(&code), "cinema:reservation:0607-1234-5678-910");

        let showtime = ShowtimeId::new();
        assert_eq!(
            repo.showtime_index_key(showtime),
            format!("cinema:showtime:{}:reservations", showtime)
        );
    }

    #[tokio::test]
    #[ignore = "requires a running Redis (REDIS_URL)"]
    async fn test_insert_find_refund() {
        let repo = RedisReservationRepository::new(&redis_url(), "cinema-test").await.unwrap();
        let showtime = ShowtimeId::new();
        let reservation = reservation(showtime, &random_code());

        repo.insert(&reservation).await.unwrap();
        assert_eq!(
            repo.insert(&reservation).await,
            Err(LedgerError::DuplicateCode(reservation.code.clone()))
        );
        assert!(repo.exists(&reservation.code).await.unwrap());
        assert_eq!(repo.find(&reservation.code).await.unwrap(), reservation);

        let refunded = repo.mark_refunded(&reservation.code, Utc::now()).await.unwrap();
        assert!(!refunded.is_active());
        assert_eq!(
            repo.mark_refunded(&reservation.code, Utc::now()).await,
            Err(LedgerError::AlreadyRefunded(reservation.code.clone()))
        );

        let listed = repo.list_by_showtime(showtime).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(!listed[0].is_active());
    }

    #[tokio::test]
    #[ignore = "requires a running Redis (REDIS_URL)"]
    async fn test_concurrent_refund_single_winner() {
        let repo = RedisReservationRepository::new(&redis_url(), "cinema-test").await.unwrap();
        let reservation = reservation(ShowtimeId::new(), &random_code());
        repo.insert(&reservation).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repo = repo.clone();
                let code = reservation.code.clone();
                tokio::spawn(async move { repo.mark_refunded(&code, Utc::now()).await })
            })
            .collect();

        let mut refunded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => refunded += 1,
                Err(LedgerError::AlreadyRefunded(_)) | Err(LedgerError::Storage(_)) => {}
                Err(e) => panic!("unexpected error {e}"),
            }
        }
        assert_eq!(refunded, 1);
    }
}
