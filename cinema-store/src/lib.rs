pub mod app_config;
pub mod redis_repo;

pub use app_config::{Config, LedgerBackend};
pub use redis_repo::RedisReservationRepository;
