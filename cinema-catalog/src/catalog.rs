use async_trait::async_trait;
use cinema_core::ShowtimeId;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

use crate::showtime::Showtime;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Showtime not found: {0}")]
    NotFound(ShowtimeId),

    #[error("Showtime already exists: {0}")]
    AlreadyExists(ShowtimeId),

    #[error("Invalid showtime: {0}")]
    InvalidShowtime(String),
}

/// Read side of the external movie/showtime catalog.
#[async_trait]
pub trait ShowtimeCatalog: Send + Sync {
    async fn get_showtime(&self, id: ShowtimeId) -> Result<Showtime, CatalogError>;

    async fn list_showtimes(&self) -> Result<Vec<Showtime>, CatalogError>;

    /// Add a showtime. Existing showtimes are never replaced.
    async fn register(&self, showtime: Showtime) -> Result<(), CatalogError>;
}

#[derive(Default)]
pub struct InMemoryShowtimeCatalog {
    showtimes: RwLock<HashMap<ShowtimeId, Showtime>>,
}

impl InMemoryShowtimeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from seed data, rejecting invalid or duplicate entries.
    pub fn with_showtimes(showtimes: Vec<Showtime>) -> Result<Self, CatalogError> {
        let mut map = HashMap::with_capacity(showtimes.len());
        for showtime in showtimes {
            showtime.validate()?;
            if map.contains_key(&showtime.id) {
                return Err(CatalogError::AlreadyExists(showtime.id));
            }
            map.insert(showtime.id, showtime);
        }
        Ok(Self {
            showtimes: RwLock::new(map),
        })
    }
}

#[async_trait]
impl ShowtimeCatalog for InMemoryShowtimeCatalog {
    async fn get_showtime(&self, id: ShowtimeId) -> Result<Showtime, CatalogError> {
        self.showtimes
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(CatalogError::NotFound(id))
    }

    async fn list_showtimes(&self) -> Result<Vec<Showtime>, CatalogError> {
        let mut showtimes: Vec<Showtime> = self.showtimes.read().await.values().cloned().collect();
        showtimes.sort_by_key(|s| (s.starts_at, s.id));
        Ok(showtimes)
    }

    async fn register(&self, showtime: Showtime) -> Result<(), CatalogError> {
        showtime.validate()?;

        let mut showtimes = self.showtimes.write().await;
        if showtimes.contains_key(&showtime.id) {
            return Err(CatalogError::AlreadyExists(showtime.id));
        }

        info!(
            "Showtime registered: {} ({} @ {})",
            showtime.id, showtime.movie_title, showtime.starts_at
        );
        showtimes.insert(showtime.id, showtime);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::showtime::fixtures;

    #[tokio::test]
    async fn test_register_and_get() {
        let catalog = InMemoryShowtimeCatalog::new();
        let showtime = fixtures::showtime(5, 10);
        let id = showtime.id;

        catalog.register(showtime.clone()).await.unwrap();
        assert_eq!(catalog.get_showtime(id).await.unwrap().movie_id, "20236180");

        // Immutable after creation
        let result = catalog.register(showtime).await;
        assert_eq!(result, Err(CatalogError::AlreadyExists(id)));

        let missing = ShowtimeId::new();
        assert_eq!(
            catalog.get_showtime(missing).await.unwrap_err(),
            CatalogError::NotFound(missing)
        );
    }

    #[tokio::test]
    async fn test_seed_rejects_invalid() {
        let mut bad = fixtures::showtime(5, 10);
        bad.geometry.seats_per_row = 0;
        assert!(InMemoryShowtimeCatalog::with_showtimes(vec![bad]).is_err());

        let good = fixtures::showtime(5, 10);
        let catalog = InMemoryShowtimeCatalog::with_showtimes(vec![good]).unwrap();
        assert_eq!(catalog.list_showtimes().await.unwrap().len(), 1);
    }
}
