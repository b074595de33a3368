use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CoreError;

/// Number of digits in a reservation code (4-4-4-3 groups).
pub const CODE_DIGITS: usize = 15;

const GROUPS: [usize; 4] = [4, 4, 4, 3];

// ASCII digits only; `\d` would also admit other Unicode decimal digits.
static CODE_FORMAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{4}-[0-9]{4}-[0-9]{4}-[0-9]{3}$").expect("reservation code pattern is valid")
});

/// Externally presentable booking identifier, e.g. `0607-1234-5678-910`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReservationCode(String);

impl ReservationCode {
    pub fn is_valid_format(code: &str) -> bool {
        CODE_FORMAT.is_match(code)
    }

    pub fn parse(code: &str) -> Result<Self, CoreError> {
        if Self::is_valid_format(code) {
            Ok(Self(code.to_string()))
        } else {
            Err(CoreError::InvalidCodeFormat(code.to_string()))
        }
    }

    /// Builds a code from 15 digit values; each value is taken modulo 10.
    pub fn from_digits(digits: [u8; CODE_DIGITS]) -> Self {
        let mut code = String::with_capacity(CODE_DIGITS + GROUPS.len() - 1);
        let mut digits = digits.iter();

        for (i, len) in GROUPS.iter().enumerate() {
            if i > 0 {
                code.push('-');
            }
            for d in digits.by_ref().take(*len) {
                code.push(char::from(b'0' + d % 10));
            }
        }

        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReservationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ReservationCode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ReservationCode {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if Self::is_valid_format(&value) {
            Ok(Self(value))
        } else {
            Err(CoreError::InvalidCodeFormat(value))
        }
    }
}

impl From<ReservationCode> for String {
    fn from(code: ReservationCode) -> Self {
        code.0
    }
}
