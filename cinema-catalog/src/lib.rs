pub mod catalog;
pub mod inventory;
pub mod showtime;

pub use catalog::{CatalogError, InMemoryShowtimeCatalog, ShowtimeCatalog};
pub use inventory::{Hold, InventoryError, InventoryManager, SeatMapView, SeatStatus, SeatView};
pub use showtime::{SeatGeometry, Showtime, MAX_SEATS_PER_ROW};
