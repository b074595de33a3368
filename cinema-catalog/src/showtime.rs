use chrono::{DateTime, Utc};
use cinema_core::{SeatId, ShowtimeId, MAX_ROWS};
use serde::{Deserialize, Serialize};

use crate::catalog::CatalogError;

pub const MAX_SEATS_PER_ROW: u16 = 99;

/// Rectangular seat layout: rows `A..` times seats `1..=seats_per_row`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatGeometry {
    pub rows: u16,
    pub seats_per_row: u16,
}

impl SeatGeometry {
    pub fn new(rows: u16, seats_per_row: u16) -> Self {
        Self { rows, seats_per_row }
    }

    pub fn contains(&self, seat: &SeatId) -> bool {
        seat.row < self.rows && seat.number >= 1 && seat.number <= self.seats_per_row
    }

    pub fn capacity(&self) -> usize {
        self.rows as usize * self.seats_per_row as usize
    }

    /// Position of a seat in a row-major layout. `None` outside the geometry.
    pub fn index_of(&self, seat: &SeatId) -> Option<usize> {
        self.contains(seat)
            .then(|| seat.row as usize * self.seats_per_row as usize + (seat.number as usize - 1))
    }

    /// All seats in canonical order.
    pub fn seats(&self) -> impl Iterator<Item = SeatId> + '_ {
        (0..self.rows).flat_map(move |row| {
            (1..=self.seats_per_row).map(move |number| SeatId::new(row, number))
        })
    }
}

/// A scheduled screening. Immutable once registered in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Showtime {
    pub id: ShowtimeId,
    /// Reference into the external movie catalog.
    pub movie_id: String,
    pub movie_title: String,
    pub cinema: String,
    pub screen: String,
    pub starts_at: DateTime<Utc>,
    pub geometry: SeatGeometry,
    /// Minor currency units.
    pub price_per_seat: i64,
    pub currency: String,
}

impl Showtime {
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.geometry.rows == 0 || self.geometry.rows > MAX_ROWS {
            return Err(CatalogError::InvalidShowtime(format!(
                "rows must be between 1 and {}, got {}",
                MAX_ROWS, self.geometry.rows
            )));
        }
        if self.geometry.seats_per_row == 0 || self.geometry.seats_per_row > MAX_SEATS_PER_ROW {
            return Err(CatalogError::InvalidShowtime(format!(
                "seats_per_row must be between 1 and {}, got {}",
                MAX_SEATS_PER_ROW, self.geometry.seats_per_row
            )));
        }
        if self.price_per_seat < 0 {
            return Err(CatalogError::InvalidShowtime(
                "price_per_seat must not be negative".to_string(),
            ));
        }
        if self.currency.trim().is_empty() {
            return Err(CatalogError::InvalidShowtime("currency is required".to_string()));
        }
        Ok(())
    }

    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        now >= self.starts_at
    }

    /// Price for `party_size` seats, `None` on overflow.
    pub fn total_price(&self, party_size: usize) -> Option<i64> {
        i64::try_from(party_size).ok()?.checked_mul(self.price_per_seat)
    }
}
