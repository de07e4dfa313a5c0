use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_RANGE_LEN: usize = 8;

/// Look-back window of a history request (`1D`, `1W`, `1M`, `3M`, `1Y`, `5Y`).
///
/// The service accepts an open set of range codes, so any short alphanumeric
/// code is representable; [`HistoryRange::STANDARD`] lists the ones the
/// detail screen offers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HistoryRange(String);

impl HistoryRange {
    pub const STANDARD: [&'static str; 6] = ["1D", "1W", "1M", "3M", "1Y", "5Y"];

    pub fn one_day() -> Self {
        Self(String::from("1D"))
    }

    pub fn one_week() -> Self {
        Self(String::from("1W"))
    }

    pub fn one_month() -> Self {
        Self(String::from("1M"))
    }

    pub fn three_months() -> Self {
        Self(String::from("3M"))
    }

    pub fn one_year() -> Self {
        Self(String::from("1Y"))
    }

    pub fn five_years() -> Self {
        Self(String::from("5Y"))
    }

    pub fn standard() -> Vec<Self> {
        Self::STANDARD
            .iter()
            .map(|code| Self(String::from(*code)))
            .collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_standard(&self) -> bool {
        Self::STANDARD.contains(&self.as_str())
    }
}

impl Display for HistoryRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryRange {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase();
        let valid = !normalized.is_empty()
            && normalized.len() <= MAX_RANGE_LEN
            && normalized.chars().all(|ch| ch.is_ascii_alphanumeric());

        if !valid {
            return Err(ValidationError::InvalidRange {
                value: value.to_owned(),
            });
        }

        Ok(Self(normalized))
    }
}

impl TryFrom<String> for HistoryRange {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str(&value)
    }
}

impl From<HistoryRange> for String {
    fn from(value: HistoryRange) -> Self {
        value.0
    }
}
