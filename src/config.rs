//! Run configuration, loadable from TOML.
//!
//! ```toml
//! seats = 3
//! threshold = "droop"
//! seat_quota = 1
//!
//! [tie_break]
//! seed = "1f2e"
//! ```

use crate::tabulator::{Options, ThresholdFormula, TieBreakMode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CountConfig {
    /// Seats to fill. Half the ballot count when absent.
    #[serde(default)]
    pub seats: Option<usize>,

    #[serde(default)]
    pub threshold: ThresholdKind,

    /// Seat limit for every constituency that does not set its own.
    #[serde(default)]
    pub seat_quota: Option<usize>,

    #[serde(default)]
    pub tie_break: TieBreakConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdKind {
    Droop,
    Alternate,
}

impl Default for ThresholdKind {
    fn default() -> Self {
        ThresholdKind::Droop
    }
}

impl FromStr for ThresholdKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "droop" => Ok(ThresholdKind::Droop),
            "alternate" => Ok(ThresholdKind::Alternate),
            other => Err(ConfigError::Invalid(format!(
                "unknown threshold formula {:?} (expected droop or alternate)",
                other
            ))),
        }
    }
}

impl fmt::Display for ThresholdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdKind::Droop => f.write_str("droop"),
            ThresholdKind::Alternate => f.write_str("alternate"),
        }
    }
}

impl From<ThresholdKind> for ThresholdFormula {
    fn from(kind: ThresholdKind) -> Self {
        match kind {
            ThresholdKind::Droop => ThresholdFormula::Droop,
            ThresholdKind::Alternate => ThresholdFormula::Alternate,
        }
    }
}

/// At most one of `seed` and `manual` may be given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TieBreakConfig {
    /// Hexadecimal seed for reproducible random choices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,

    /// Indices consumed in order, one per tie.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual: Option<Vec<usize>>,
}

impl TieBreakConfig {
    pub fn mode(&self) -> Result<TieBreakMode> {
        match (&self.seed, &self.manual) {
            (Some(_), Some(_)) => Err(ConfigError::Invalid(
                "tie_break.seed and tie_break.manual are mutually exclusive".to_string(),
            )),
            (Some(seed), None) => Ok(TieBreakMode::Seeded(Some(parse_seed(seed)?))),
            (None, Some(choices)) => Ok(TieBreakMode::Manual(choices.clone())),
            (None, None) => Ok(TieBreakMode::Seeded(None)),
        }
    }
}

/// Parses a seed written in hexadecimal, with or without a `0x` prefix.
pub fn parse_seed(s: &str) -> Result<u64> {
    let digits = s.trim();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(digits);
    u64::from_str_radix(digits, 16)
        .map_err(|e| ConfigError::Invalid(format!("invalid seed {:?}: {}", s, e)))
}

impl CountConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_toml_file(path)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: CountConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.seats == Some(0) {
            return Err(ConfigError::Invalid("seats must be positive".to_string()));
        }
        if self.seat_quota == Some(0) {
            return Err(ConfigError::Invalid(
                "seat_quota must be positive; omit it for no limit".to_string(),
            ));
        }
        self.tie_break.mode().map(|_| ())
    }

    pub fn with_seats(mut self, seats: usize) -> Self {
        self.seats = Some(seats);
        self
    }

    /// Seats for an election with `ballots` valid ballots.
    pub fn seats_for(&self, ballots: usize) -> usize {
        self.seats.unwrap_or_else(|| (ballots / 2).max(1))
    }

    pub fn to_options(&self, ballots: usize) -> Result<Options> {
        self.validate()?;
        Ok(Options {
            seats: self.seats_for(ballots),
            threshold: self.threshold.into(),
            tie_break: self.tie_break.mode()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_file() {
        let config = CountConfig::from_toml_str(
            r#"
            seats = 3
            threshold = "alternate"
            seat_quota = 1

            [tie_break]
            seed = "0xff"
            "#,
        )
        .unwrap();
        assert_eq!(config.seats, Some(3));
        assert_eq!(config.threshold, ThresholdKind::Alternate);
        assert_eq!(config.seat_quota, Some(1));
        assert_eq!(config.tie_break.mode().unwrap(), TieBreakMode::Seeded(Some(255)));
    }

    #[test]
    fn empty_file_gives_defaults() {
        let config = CountConfig::from_toml_str("").unwrap();
        assert_eq!(config, CountConfig::default());
        let options = config.to_options(9).unwrap();
        assert_eq!(options.seats, 4);
        assert_eq!(options.tie_break, TieBreakMode::Seeded(None));
    }

    #[test]
    fn manual_choices() {
        let config = CountConfig::from_toml_str("[tie_break]\nmanual = [1, 0]\n").unwrap();
        assert_eq!(
            config.tie_break.mode().unwrap(),
            TieBreakMode::Manual(vec![1, 0])
        );
    }

    #[test]
    fn rejects_conflicting_and_zero_values() {
        let both = "[tie_break]\nseed = \"1\"\nmanual = [0]\n";
        assert!(matches!(
            CountConfig::from_toml_str(both),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            CountConfig::from_toml_str("seats = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            CountConfig::from_toml_str("seat_quota = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            CountConfig::from_toml_str("threshold = \"hare\""),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn threshold_kind_from_flag() {
        assert_eq!("Droop".parse::<ThresholdKind>().unwrap(), ThresholdKind::Droop);
        assert!("hare".parse::<ThresholdKind>().is_err());
        assert!(parse_seed("zz").is_err());
        assert_eq!(parse_seed("0X10").unwrap(), 16);
    }
}
