use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Highest sequence number that still fits the three-digit suffix.
pub const MAX_DAILY_SEQUENCE: u32 = 999;

static NUMBER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^WO-(\d{8})-(\d{3})$").expect("valid work order number regex"));

/// Business identifier of the form `WO-YYYYMMDD-NNN`.
///
/// The date is the creation date and `NNN` the per-date sequence, starting at 001.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkOrderNumber {
    date: NaiveDate,
    sequence: u32,
}

impl WorkOrderNumber {
    /// `None` when `sequence` is outside 1..=999.
    pub fn new(date: NaiveDate, sequence: u32) -> Option<Self> {
        (1..=MAX_DAILY_SEQUENCE)
            .contains(&sequence)
            .then_some(Self { date, sequence })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl fmt::Display for WorkOrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WO-{}-{:03}", self.date.format("%Y%m%d"), self.sequence)
    }
}

impl FromStr for WorkOrderNumber {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = NUMBER_PATTERN
            .captures(s)
            .ok_or_else(|| format!("'{s}' does not match WO-YYYYMMDD-NNN"))?;
        let date = NaiveDate::parse_from_str(&caps[1], "%Y%m%d")
            .map_err(|e| format!("'{s}' has an invalid date: {e}"))?;
        let sequence: u32 = caps[2]
            .parse()
            .map_err(|e| format!("'{s}' has an invalid sequence: {e}"))?;
        WorkOrderNumber::new(date, sequence).ok_or_else(|| format!("'{s}' has sequence 000"))
    }
}

impl TryFrom<String> for WorkOrderNumber {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WorkOrderNumber> for String {
    fn from(value: WorkOrderNumber) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 7).unwrap()
    }

    #[test]
    fn test_format_is_zero_padded() {
        assert_eq!(WorkOrderNumber::new(date(), 1).unwrap().to_string(), "WO-20250307-001");
        assert_eq!(WorkOrderNumber::new(date(), 42).unwrap().to_string(), "WO-20250307-042");
        assert_eq!(WorkOrderNumber::new(date(), 999).unwrap().to_string(), "WO-20250307-999");
    }

    #[test]
    fn test_sequence_bounds() {
        assert!(WorkOrderNumber::new(date(), 0).is_none());
        assert!(WorkOrderNumber::new(date(), 1000).is_none());
    }

    #[test]
    fn test_parse() {
        let number: WorkOrderNumber = "WO-20250307-012".parse().unwrap();
        assert_eq!(number.date(), date());
        assert_eq!(number.sequence(), 12);

        assert!("WO-20250307-12".parse::<WorkOrderNumber>().is_err());
        assert!("WO-20251307-001".parse::<WorkOrderNumber>().is_err());
        assert!("WO-20250307-000".parse::<WorkOrderNumber>().is_err());
        assert!("XX-20250307-001".parse::<WorkOrderNumber>().is_err());
    }

    #[test]
    fn test_ordering_follows_date_then_sequence() {
        let a = WorkOrderNumber::new(date(), 2).unwrap();
        let b = WorkOrderNumber::new(date().succ_opt().unwrap(), 1).unwrap();
        assert!(a < b);
    }
}
