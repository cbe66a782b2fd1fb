use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ModelError;

const UNLIMITED: &str = "unlimited";

/// A positive resource amount, or no limit at all.
///
/// Used for both the job count and the memory budget of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Limit {
    Count(u64),
    Unlimited,
}

impl Limit {
    /// Build a bounded limit; zero is rejected.
    pub fn count(n: u64) -> Result<Self, ModelError> {
        if n == 0 {
            return Err(ModelError::NonPositive(0));
        }
        Ok(Limit::Count(n))
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, Limit::Unlimited)
    }

    /// Returns the bound, if any.
    pub fn get(&self) -> Option<u64> {
        match self {
            Limit::Count(n) => Some(*n),
            Limit::Unlimited => None,
        }
    }

    /// Multiply a bounded value, saturating; `Unlimited` stays unlimited.
    pub fn scaled(&self, factor: u64) -> Limit {
        match self {
            Limit::Count(n) => Limit::Count(n.saturating_mul(factor)),
            Limit::Unlimited => Limit::Unlimited,
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Count(n) => write!(f, "{n}"),
            Limit::Unlimited => f.write_str(UNLIMITED),
        }
    }
}

impl FromStr for Limit {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == UNLIMITED {
            return Ok(Limit::Unlimited);
        }
        let n: i64 = s
            .parse()
            .map_err(|_| ModelError::InvalidLimit(s.to_string()))?;
        if n <= 0 {
            return Err(ModelError::NonPositive(n));
        }
        Ok(Limit::Count(n as u64))
    }
}

impl Serialize for Limit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Limit::Count(n) => serializer.serialize_u64(*n),
            Limit::Unlimited => serializer.serialize_str(UNLIMITED),
        }
    }
}

impl<'de> Deserialize<'de> for Limit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Num(n) if n > 0 => Ok(Limit::Count(n as u64)),
            Raw::Num(n) => Err(serde::de::Error::custom(ModelError::NonPositive(n))),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}
