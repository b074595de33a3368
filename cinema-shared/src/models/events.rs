use uuid::Uuid;

/// What happened to a group of seats.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatChangeKind {
    Held,
    Booked,
    Released,
    Expired,
}

/// Published whenever seats of a showtime change state. Seat labels are the
/// human form (`A1`, `F7`) so consumers don't need the core types.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct SeatsChangedEvent {
    pub showtime_id: Uuid,
    pub seats: Vec<String>,
    pub kind: SeatChangeKind,
    pub occurred_at: i64,
}

impl SeatsChangedEvent {
    pub fn new(
        showtime_id: Uuid,
        seats: Vec<String>,
        kind: SeatChangeKind,
        occurred_at: i64,
    ) -> Self {
        Self {
            showtime_id,
            seats,
            kind,
            occurred_at,
        }
    }

    /// Server-sent event name, e.g. `seats_held`.
    pub fn event_name(&self) -> &'static str {
        match self.kind {
            SeatChangeKind::Held => "seats_held",
            SeatChangeKind::Booked => "seats_booked",
            SeatChangeKind::Released => "seats_released",
            SeatChangeKind::Expired => "seats_expired",
        }
    }
}
