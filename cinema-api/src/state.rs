use cinema_catalog::ShowtimeCatalog;
use cinema_order::BookingService;
use cinema_shared::SeatsChangedEvent;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::middleware::CircuitBreaker;

pub struct ResiliencyState {
    pub reservations_cb: CircuitBreaker,
}

#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<BookingService>,
    pub catalog: Arc<dyn ShowtimeCatalog>,
    pub sse_tx: broadcast::Sender<SeatsChangedEvent>,
    pub resiliency: Arc<ResiliencyState>,
}

impl AppState {
    pub fn new(
        bookings: Arc<BookingService>,
        catalog: Arc<dyn ShowtimeCatalog>,
        sse_tx: broadcast::Sender<SeatsChangedEvent>,
        reservations_cb: CircuitBreaker,
    ) -> Self {
        Self {
            bookings,
            catalog,
            sse_tx,
            resiliency: Arc::new(ResiliencyState { reservations_cb }),
        }
    }
}
