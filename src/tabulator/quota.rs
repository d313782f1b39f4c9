use super::{CountError, Result};
use std::fmt;
use std::sync::Arc;

/// A threshold callback: `(valid ballots, seats) -> threshold`.
pub type CustomThreshold = Arc<dyn Fn(usize, usize) -> u64 + Send + Sync>;

/// How the election threshold is computed. Chosen once per count.
#[derive(Clone)]
pub enum ThresholdFormula {
    /// `floor(V / (S + 1)) + 1`
    Droop,
    /// `ceil(1 + V / (S + 1))`
    Alternate,
    Custom(CustomThreshold),
}

impl ThresholdFormula {
    pub fn custom<F>(formula: F) -> Self
    where
        F: Fn(usize, usize) -> u64 + Send + Sync + 'static,
    {
        ThresholdFormula::Custom(Arc::new(formula))
    }

    pub fn threshold(&self, ballots: usize, seats: usize) -> Result<u64> {
        if seats == 0 {
            return Err(CountError::Configuration(
                "the number of seats must be positive".to_string(),
            ));
        }
        let votes = ballots as u64;
        let divisor = seats as u64 + 1;
        let threshold = match self {
            ThresholdFormula::Droop => votes / divisor + 1,
            ThresholdFormula::Alternate => 1 + (votes + divisor - 1) / divisor,
            ThresholdFormula::Custom(formula) => formula(ballots, seats),
        };
        if threshold == 0 {
            return Err(CountError::Configuration(format!(
                "threshold formula returned zero for {} ballots and {} seats",
                ballots, seats
            )));
        }
        Ok(threshold)
    }
}

impl Default for ThresholdFormula {
    fn default() -> Self {
        ThresholdFormula::Droop
    }
}

impl fmt::Debug for ThresholdFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdFormula::Droop => write!(f, "Droop"),
            ThresholdFormula::Alternate => write!(f, "Alternate"),
            ThresholdFormula::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn droop_threshold() {
        let droop = ThresholdFormula::Droop;
        assert_eq!(droop.threshold(4, 1).unwrap(), 3);
        assert_eq!(droop.threshold(4, 2).unwrap(), 2);
        assert_eq!(droop.threshold(100, 3).unwrap(), 26);
        assert_eq!(droop.threshold(0, 3).unwrap(), 1);
    }

    #[test]
    fn alternate_threshold_rounds_up() {
        let alternate = ThresholdFormula::Alternate;
        assert_eq!(alternate.threshold(4, 1).unwrap(), 3);
        assert_eq!(alternate.threshold(5, 1).unwrap(), 4);
        assert_eq!(alternate.threshold(100, 3).unwrap(), 26);
        assert_eq!(alternate.threshold(101, 3).unwrap(), 27);
    }

    #[test]
    fn custom_formula_is_used() {
        let half = ThresholdFormula::custom(|ballots, _| ballots as u64 / 2);
        assert_eq!(half.threshold(10, 3).unwrap(), 5);
    }

    #[test]
    fn zero_seats_is_a_configuration_error() {
        let err = ThresholdFormula::Droop.threshold(10, 0).unwrap_err();
        assert!(matches!(err, CountError::Configuration(_)));
    }

    #[test]
    fn custom_formula_returning_zero_is_rejected() {
        let broken = ThresholdFormula::custom(|_, _| 0);
        assert!(matches!(
            broken.threshold(10, 2),
            Err(CountError::Configuration(_))
        ));
    }
}
