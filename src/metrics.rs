//! Derived financial metrics
//!
//! Both metrics are total functions: unknown or zero inputs map to `0.0`
//! rather than an error, because a single game without play time or list
//! price must not stop the report.

use serde::{Deserialize, Serialize};

/// How price-per-hour treats a game played for less than one hour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubHourPolicy {
    /// Report the hours played instead of a ratio. Long-standing report
    /// behaviour, kept until someone decides otherwise.
    #[default]
    RawHours,
    /// Report `paid / hours` like any other game.
    TrueRatio,
}

pub fn minutes_to_hours(minutes: u64) -> f64 {
    minutes as f64 / 60.0
}

/// Amount paid per hour played.
pub fn price_per_hour(paid: f64, minutes: u64, policy: SubHourPolicy) -> f64 {
    let hours = minutes_to_hours(minutes);
    if hours == 0.0 {
        return 0.0;
    }
    if hours < 1.0 && policy == SubHourPolicy::RawHours {
        return hours;
    }
    paid / hours
}

/// Fraction of the list price saved. Negative when more than the recorded
/// list price was paid.
pub fn discount_fraction(paid: f64, original: Option<f64>) -> f64 {
    match original {
        Some(original) if original != 0.0 => 1.0 - paid / original,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_per_hour_without_playtime() {
        assert_eq!(price_per_hour(20.0, 0, SubHourPolicy::RawHours), 0.0);
        assert_eq!(price_per_hour(20.0, 0, SubHourPolicy::TrueRatio), 0.0);
    }

    #[test]
    fn test_price_per_hour_under_one_hour() {
        assert_eq!(price_per_hour(5.0, 30, SubHourPolicy::RawHours), 0.5);
        assert_eq!(price_per_hour(5.0, 30, SubHourPolicy::TrueRatio), 10.0);
    }

    #[test]
    fn test_price_per_hour_ratio() {
        assert_eq!(price_per_hour(20.0, 600, SubHourPolicy::RawHours), 2.0);
        assert_eq!(price_per_hour(20.0, 60, SubHourPolicy::RawHours), 20.0);
        assert_eq!(price_per_hour(0.0, 600, SubHourPolicy::RawHours), 0.0);
    }

    #[test]
    fn test_discount_unknown_original() {
        assert_eq!(discount_fraction(5.0, None), 0.0);
        assert_eq!(discount_fraction(5.0, Some(0.0)), 0.0);
    }

    #[test]
    fn test_discount_fraction() {
        assert_eq!(discount_fraction(5.0, Some(10.0)), 0.5);
        assert_eq!(discount_fraction(10.0, Some(10.0)), 0.0);
        assert_eq!(discount_fraction(0.0, Some(10.0)), 1.0);
    }

    #[test]
    fn test_discount_is_not_clamped() {
        assert_eq!(discount_fraction(15.0, Some(10.0)), -0.5);
    }
}
