use cinema_order::BookingService;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Periodically expire lapsed holds so the seat map and the event stream
/// catch up even when nobody touches a showtime.
pub async fn start_hold_sweeper(bookings: Arc<BookingService>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    info!("Hold sweeper started, running every {:?}", every);

    loop {
        ticker.tick().await;
        let expired = bookings.sweep_expired_holds();
        if expired > 0 {
            info!("Sweeper expired {} holds", expired);
        } else {
            debug!("Sweeper found no expired holds");
        }
    }
}
