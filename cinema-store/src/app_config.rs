use chrono::{DateTime, Utc};
use cinema_catalog::{SeatGeometry, Showtime};
use cinema_core::ShowtimeId;
use serde::Deserialize;
use std::env;
use uuid::Uuid;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    pub redis: Option<RedisConfig>,
    pub business_rules: BusinessRules,
    #[serde(default)]
    pub resiliency: ResiliencyConfig,
    #[serde(default)]
    pub showtimes: Vec<ShowtimeSeed>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LedgerConfig {
    #[serde(default)]
    pub backend: LedgerBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_key_prefix() -> String {
    "cinema".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    pub seat_hold_seconds: u64,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
    #[serde(default = "default_code_attempts")]
    pub code_attempts: u32,
    #[serde(default = "default_payment_timeout")]
    pub payment_timeout_seconds: u64,
}

fn default_sweep_interval() -> u64 {
    5
}

fn default_code_attempts() -> u32 {
    8
}

fn default_payment_timeout() -> u64 {
    30
}

impl BusinessRules {
    /// Seat hold lifetime; must be positive and fit a `chrono::Duration`.
    pub fn seat_hold_ttl(&self) -> Result<chrono::Duration, config::ConfigError> {
        if self.seat_hold_seconds == 0 {
            return Err(config::ConfigError::Message(
                "business_rules.seat_hold_seconds must be positive".to_string(),
            ));
        }
        i64::try_from(self.seat_hold_seconds)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| {
                config::ConfigError::Message(format!(
                    "business_rules.seat_hold_seconds out of range: {}",
                    self.seat_hold_seconds
                ))
            })
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResiliencyConfig {
    pub failure_threshold: usize,
    pub reset_timeout_seconds: u64,
}

impl Default for ResiliencyConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout_seconds: 30,
        }
    }
}

/// Showtime registered in the catalog at startup.
#[derive(Debug, Deserialize, Clone)]
pub struct ShowtimeSeed {
    pub id: Uuid,
    pub movie_id: String,
    pub movie_title: String,
    pub cinema: String,
    pub screen: String,
    pub starts_at: DateTime<Utc>,
    pub rows: u16,
    pub seats_per_row: u16,
    pub price_per_seat: i64,
    pub currency: String,
}

impl From<ShowtimeSeed> for Showtime {
    fn from(seed: ShowtimeSeed) -> Self {
        Showtime {
            id: ShowtimeId::from(seed.id),
            movie_id: seed.movie_id,
            movie_title: seed.movie_title,
            cinema: seed.cinema,
            screen: seed.screen,
            starts_at: seed.starts_at,
            geometry: SeatGeometry::new(seed.rows, seed.seats_per_row),
            price_per_seat: seed.price_per_seat,
            currency: seed.currency,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `CINEMA__SERVER__PORT=8080` sets `server.port`
            .add_source(config::Environment::with_prefix("CINEMA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    const SAMPLE: &str = r#"
        [server]
        port = 3000

        [ledger]
        backend = "redis"

        [redis]
        url = "redis://127.0.0.1/"

        [business_rules]
        seat_hold_seconds = 300

        [[showtimes]]
        id = "6f1c2a8e-1f7e-4d55-9a51-3f1c9f6a0b01"
        movie_id = "20236180"
        movie_title = "Exhuma"
        cinema = "Yongsan"
        screen = "IMAX"
        starts_at = "2030-03-01T19:30:00Z"
        rows = 10
        seats_per_row = 20
        price_per_seat = 15000
        currency = "KRW"
    "#;

    #[test]
    fn test_parse_with_defaults() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(SAMPLE, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.ledger.backend, LedgerBackend::Redis);
        assert_eq!(config.redis.as_ref().unwrap().key_prefix, "cinema");
        assert_eq!(config.business_rules.code_attempts, 8);
        assert_eq!(config.business_rules.sweep_interval_seconds, 5);
        assert_eq!(config.resiliency.failure_threshold, 5);

        let showtime: Showtime = config.showtimes[0].clone().into();
        assert_eq!(showtime.geometry.capacity(), 200);
        assert!(showtime.validate().is_ok());
        assert_eq!(
            config.business_rules.seat_hold_ttl().unwrap(),
            chrono::Duration::minutes(5)
        );
    }

    fn rules(seat_hold_seconds: u64) -> BusinessRules {
        BusinessRules {
            seat_hold_seconds,
            sweep_interval_seconds: default_sweep_interval(),
            code_attempts: default_code_attempts(),
            payment_timeout_seconds: default_payment_timeout(),
        }
    }

    #[test]
    fn test_seat_hold_ttl_rejects_zero() {
        assert!(rules(0).seat_hold_ttl().is_err());
    }

    #[test]
    fn test_seat_hold_ttl_rejects_out_of_range() {
        assert!(rules(u64::MAX).seat_hold_ttl().is_err());
        assert!(rules(i64::MAX as u64).seat_hold_ttl().is_err());
    }
}
