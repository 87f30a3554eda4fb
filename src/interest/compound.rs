use rust_decimal::{Decimal, MathematicalOps};

use crate::decimal::Rate;

/// running product of `(1 + rate)` terms
///
/// accumulating and combining are associative and commutative, so rates can
/// be grouped per period and the partial results merged in any order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateAccumulator {
    product: Decimal,
    count: u32,
}

impl RateAccumulator {
    pub const IDENTITY: RateAccumulator = RateAccumulator {
        product: Decimal::ONE,
        count: 0,
    };

    /// fold one rate into the product
    pub fn accumulate(self, rate: Rate) -> Self {
        Self {
            product: self.product * (Decimal::ONE + rate.as_decimal()),
            count: self.count + 1,
        }
    }

    /// merge two partial results
    pub fn combine(self, other: RateAccumulator) -> Self {
        Self {
            product: self.product * other.product,
            count: self.count + other.count,
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// the single rate equivalent to applying every accumulated rate in turn
    pub fn compound(&self, precision: u32) -> Rate {
        Rate::from_decimal(self.product - Decimal::ONE).round_dp(precision)
    }

    /// the constant rate that compounds to the same product over `count` periods
    pub fn geometric_mean(&self, precision: u32) -> Rate {
        if self.count == 0 {
            return Rate::ZERO;
        }
        let exponent = Decimal::ONE / Decimal::from(self.count);
        match self.product.checked_powd(exponent) {
            Some(root) => Rate::from_decimal(root - Decimal::ONE).round_dp(precision),
            None => {
                tracing::warn!(product = %self.product, count = self.count, "geometric mean root failed, using zero rate");
                Rate::ZERO
            }
        }
    }
}

impl Default for RateAccumulator {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl FromIterator<Rate> for RateAccumulator {
    fn from_iter<I: IntoIterator<Item = Rate>>(iter: I) -> Self {
        iter.into_iter().fold(Self::IDENTITY, Self::accumulate)
    }
}

/// compound a sequence of rates into one
pub fn compound_rates<I: IntoIterator<Item = Rate>>(rates: I, precision: u32) -> Rate {
    rates.into_iter().collect::<RateAccumulator>().compound(precision)
}

/// geometric mean of a sequence of rates; zero when empty
pub fn geometric_mean_rate<I: IntoIterator<Item = Rate>>(rates: I, precision: u32) -> Rate {
    rates.into_iter().collect::<RateAccumulator>().geometric_mean(precision)
}
