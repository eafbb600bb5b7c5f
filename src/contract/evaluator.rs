//! Winning-state evaluation per contract family

use super::Prediction;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Default sub-pip scaling: three decimal places
pub const DEFAULT_PIP_DECIMALS: u32 = 3;

/// Largest scaling exponent that cannot overflow a `u64` power of ten
const MAX_PIP_DECIMALS: u32 = 19;

/// Last digit of `price` after shifting it left by `pip_decimals` places.
///
/// `100.007` at 3 decimals scales to `100007` and yields 7. Digits beyond the
/// scaled integer part are truncated, so `100.0079` also yields 7. The sign is
/// ignored.
pub fn scaled_last_digit(price: Decimal, pip_decimals: u32) -> u8 {
    let factor = Decimal::from(10u64.pow(pip_decimals.min(MAX_PIP_DECIMALS)));
    price
        .abs()
        .checked_mul(factor)
        .map(|scaled| scaled.trunc() % Decimal::TEN)
        .and_then(|digit| digit.to_u8())
        .unwrap_or(0)
}

/// Pure settlement rules for every supported prediction kind
#[derive(Debug, Clone, Copy)]
pub struct ContractEvaluator {
    pip_decimals: u32,
}

impl Default for ContractEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_PIP_DECIMALS)
    }
}

impl ContractEvaluator {
    pub fn new(pip_decimals: u32) -> Self {
        Self { pip_decimals }
    }

    pub fn pip_decimals(&self) -> u32 {
        self.pip_decimals
    }

    /// Digit that barrier contracts settle against
    pub fn last_digit(&self, price: Decimal) -> u8 {
        scaled_last_digit(price, self.pip_decimals)
    }

    /// Whether a contract would be winning if settled at `current`.
    ///
    /// Barrier contracts without a barrier are never winning, and neither is
    /// an unrecognized prediction kind.
    pub fn is_winning(
        &self,
        prediction: Prediction,
        entry: Decimal,
        current: Decimal,
        barrier: Option<Decimal>,
    ) -> bool {
        match prediction {
            Prediction::Rise | Prediction::Higher => current > entry,
            Prediction::Fall | Prediction::Lower => current < entry,
            Prediction::Even => self.last_digit(current) % 2 == 0,
            Prediction::Odd => self.last_digit(current) % 2 == 1,
            Prediction::Over | Prediction::Under | Prediction::Matches | Prediction::Differs => {
                let Some(barrier) = barrier else {
                    return false;
                };
                let digit = Decimal::from(self.last_digit(current));
                match prediction {
                    Prediction::Over => digit > barrier,
                    Prediction::Under => digit < barrier,
                    Prediction::Matches => digit == barrier,
                    _ => digit != barrier,
                }
            }
            Prediction::Unknown => false,
        }
    }
}
