use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Zero};
use serde::de::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// An exact vote total or ballot weight.
///
/// Renders as `numer/denom`, or as a bare integer when the denominator is
/// one. Serializes as that same string so totals never pass through a float.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Votes(pub BigRational);

impl Votes {
    pub fn zero() -> Self {
        Votes(BigRational::zero())
    }

    pub fn whole(n: u64) -> Self {
        Votes(BigRational::from_integer(BigInt::from(n)))
    }

    pub fn ratio(numer: i64, denom: i64) -> Self {
        Votes(BigRational::new(BigInt::from(numer), BigInt::from(denom)))
    }

    pub fn as_ratio(&self) -> &BigRational {
        &self.0
    }
}

impl From<BigRational> for Votes {
    fn from(value: BigRational) -> Self {
        Votes(value)
    }
}

impl From<&BigRational> for Votes {
    fn from(value: &BigRational) -> Self {
        Votes(value.clone())
    }
}

impl fmt::Display for Votes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.denom().is_one() {
            write!(f, "{}", self.0.numer())
        } else {
            write!(f, "{}/{}", self.0.numer(), self.0.denom())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid vote value: {0:?}")]
pub struct ParseVotesError(String);

impl FromStr for Votes {
    type Err = ParseVotesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseVotesError(s.to_string());
        let (numer, denom) = match s.split_once('/') {
            Some((numer, denom)) => (numer, denom),
            None => (s, "1"),
        };
        let numer = BigInt::from_str(numer.trim()).map_err(|_| invalid())?;
        let denom = BigInt::from_str(denom.trim()).map_err(|_| invalid())?;
        if denom.is_zero() {
            return Err(invalid());
        }
        Ok(Votes(BigRational::new(numer, denom)))
    }
}

impl Serialize for Votes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Votes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum VotesInput {
            String(String),
            Number(u64),
        }

        match VotesInput::deserialize(deserializer)? {
            VotesInput::String(raw) => raw.parse::<Votes>().map_err(D::Error::custom),
            VotesInput::Number(value) => Ok(Votes::whole(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_render_without_denominator() {
        assert_eq!(Votes::whole(3).to_string(), "3");
        assert_eq!(Votes::ratio(6, 3).to_string(), "2");
        assert_eq!(Votes::ratio(2, 6).to_string(), "1/3");
    }

    #[test]
    fn parses_fractions_and_integers() {
        assert_eq!("7/3".parse::<Votes>().unwrap(), Votes::ratio(7, 3));
        assert_eq!("12".parse::<Votes>().unwrap(), Votes::whole(12));
        assert!("1/0".parse::<Votes>().is_err());
        assert!("one".parse::<Votes>().is_err());
    }

    #[test]
    fn serializes_as_exact_string() {
        let json = serde_json::to_string(&Votes::ratio(1, 3)).unwrap();
        assert_eq!(json, r#""1/3""#);
        let parsed: Votes = serde_json::from_str(r#""2/3""#).unwrap();
        assert_eq!(parsed, Votes::ratio(2, 3));
        let parsed: Votes = serde_json::from_str("4").unwrap();
        assert_eq!(parsed, Votes::whole(4));
    }
}
