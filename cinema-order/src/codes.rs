use cinema_core::code::CODE_DIGITS;
use cinema_core::ReservationCode;
use rand::Rng;
use tracing::warn;

use crate::ledger::{LedgerError, ReservationRepository};

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum CodeError {
    #[error("No unused reservation code found after {0} attempts")]
    Exhausted(u32),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Issues `DDDD-DDDD-DDDD-DDD` codes that the ledger has never seen.
#[derive(Debug, Clone)]
pub struct CodeGenerator {
    max_attempts: u32,
}

impl CodeGenerator {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// A random, well-formed candidate. Uniqueness is not checked.
    pub fn candidate(&self) -> ReservationCode {
        let mut rng = rand::thread_rng();
        let mut digits = [0u8; CODE_DIGITS];
        for digit in digits.iter_mut() {
            *digit = rng.gen_range(0..10);
        }
        ReservationCode::from_digits(digits)
    }

    /// Draw candidates until one is unknown to the ledger.
    pub async fn generate(
        &self,
        ledger: &dyn ReservationRepository,
    ) -> Result<ReservationCode, CodeError> {
        for attempt in 1..=self.max_attempts {
            let code = self.candidate();
            if !ledger.exists(&code).await? {
                return Ok(code);
            }
            warn!("Reservation code collision on attempt {}: {}", attempt, code);
        }
        Err(CodeError::Exhausted(self.max_attempts))
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new(8)
    }
}
