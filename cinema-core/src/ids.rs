use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::CoreError;

/// Rows are labelled `A`..=`Z`.
pub const MAX_ROWS: u16 = 26;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShowtimeId(pub Uuid);

impl ShowtimeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ShowtimeId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ShowtimeId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for ShowtimeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ShowtimeId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| CoreError::InvalidShowtimeId(s.to_string()))
    }
}

/// A seat inside one showtime's seat map.
///
/// `row` is a zero-based row index (`A` = 0), `number` is the one-based seat
/// number printed on the ticket. The derived ordering (row, then number) is
/// the canonical order every multi-seat mutation uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeatId {
    pub row: u16,
    pub number: u16,
}

impl SeatId {
    pub fn new(row: u16, number: u16) -> Self {
        Self { row, number }
    }

    pub fn row_letter(&self) -> char {
        // Labels only exist for rows below MAX_ROWS.
        char::from(b'A' + (self.row.min(MAX_ROWS - 1) as u8))
    }

    pub fn label(&self) -> String {
        format!("{}{}", self.row_letter(), self.number)
    }

    /// Parses `A1`, `f12`, ... into a seat id.
    pub fn parse(label: &str) -> Result<Self, CoreError> {
        let label = label.trim();
        let mut chars = label.chars();
        let letter = chars
            .next()
            .filter(|c| c.is_ascii_alphabetic())
            .ok_or_else(|| CoreError::InvalidSeatLabel(label.to_string()))?
            .to_ascii_uppercase();

        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoreError::InvalidSeatLabel(label.to_string()));
        }

        let number: u16 = digits
            .parse()
            .map_err(|_| CoreError::InvalidSeatLabel(label.to_string()))?;
        if number == 0 {
            return Err(CoreError::InvalidSeatLabel(label.to_string()));
        }

        Ok(Self {
            row: (letter as u8 - b'A') as u16,
            number,
        })
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row_letter(), self.number)
    }
}

impl FromStr for SeatId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for SeatId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.label())
    }
}

impl<'de> Deserialize<'de> for SeatId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let label = String::deserialize(deserializer)?;
        SeatId::parse(&label).map_err(de::Error::custom)
    }
}

/// Opaque claim on a set of held seats. The token names its showtime so a
/// commit or release goes straight to the right contention domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HoldToken {
    pub showtime: ShowtimeId,
    pub nonce: Uuid,
}

impl HoldToken {
    pub fn new(showtime: ShowtimeId) -> Self {
        Self {
            showtime,
            nonce: Uuid::new_v4(),
        }
    }
}

impl fmt::Display for HoldToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.showtime, self.nonce)
    }
}

impl FromStr for HoldToken {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (showtime, nonce) = s
            .split_once(':')
            .ok_or_else(|| CoreError::InvalidHoldToken(s.to_string()))?;

        Ok(Self {
            showtime: showtime
                .parse()
                .map_err(|_| CoreError::InvalidHoldToken(s.to_string()))?,
            nonce: Uuid::parse_str(nonce).map_err(|_| CoreError::InvalidHoldToken(s.to_string()))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seat_label_parsing() {
        assert_eq!(SeatId::parse("A1").unwrap(), SeatId::new(0, 1));
        assert_eq!(SeatId::parse("f12").unwrap(), SeatId::new(5, 12));
        assert_eq!(SeatId::new(4, 12).label(), "E12");

        assert!(SeatId::parse("").is_err());
        assert!(SeatId::parse("A").is_err());
        assert!(SeatId::parse("A0").is_err());
        assert!(SeatId::parse("1A").is_err());
        assert!(SeatId::parse("A-1").is_err());
    }

    #[test]
    fn test_canonical_seat_order() {
        let mut seats = vec![SeatId::new(1, 1), SeatId::new(0, 10), SeatId::new(0, 2)];
        seats.sort();
        assert_eq!(seats, vec![SeatId::new(0, 2), SeatId::new(0, 10), SeatId::new(1, 1)]);
    }

    #[test]
    fn test_seat_serializes_as_label() {
        let json = serde_json::to_string(&SeatId::new(2, 7)).unwrap();
        assert_eq!(json, "\"C7\"");

        let seat: SeatId = serde_json::from_str("\"C7\"").unwrap();
        assert_eq!(seat, SeatId::new(2, 7));
        assert!(serde_json::from_str::<SeatId>("\"??\"").is_err());
    }

    #[test]
    fn test_hold_token_text_form() {
        let token = HoldToken::new(ShowtimeId::new());
        let parsed: HoldToken = token.to_string().parse().unwrap();
        assert_eq!(parsed, token);
        assert!("not-a-token".parse::<HoldToken>().is_err());
    }
}
