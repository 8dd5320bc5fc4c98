//! Silence period resolution
//!
//! Accepted combinations:
//! - a named period alone: silenced from now until now + period
//! - CUSTOM or no period with an end date, optionally a start date that
//!   must precede it
//!
//! A named period combined with explicit dates, a start date alone, and no
//! input at all are rejected.

use crate::{Error, Result};
use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SilenceAlertPeriod {
    ThisOccurrence,
    OneHour,
    TwoHours,
    SixHours,
    TwelveHours,
    OneDay,
    OneWeek,
    OneMonth,
    OneYear,
    Custom,
}

text_enum!(SilenceAlertPeriod {
    ThisOccurrence => "THIS_OCCURRENCE",
    OneHour => "ONE_HOUR",
    TwoHours => "TWO_HOURS",
    SixHours => "SIX_HOURS",
    TwelveHours => "TWELVE_HOURS",
    OneDay => "ONE_DAY",
    OneWeek => "ONE_WEEK",
    OneMonth => "ONE_MONTH",
    OneYear => "ONE_YEAR",
    Custom => "CUSTOM",
});

impl SilenceAlertPeriod {
    /// End of the period starting at `now`; None for CUSTOM
    pub fn ends_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            SilenceAlertPeriod::ThisOccurrence => Some(now),
            SilenceAlertPeriod::OneHour => Some(now + Duration::hours(1)),
            SilenceAlertPeriod::TwoHours => Some(now + Duration::hours(2)),
            SilenceAlertPeriod::SixHours => Some(now + Duration::hours(6)),
            SilenceAlertPeriod::TwelveHours => Some(now + Duration::hours(12)),
            SilenceAlertPeriod::OneDay => Some(now + Duration::days(1)),
            SilenceAlertPeriod::OneWeek => Some(now + Duration::weeks(1)),
            SilenceAlertPeriod::OneMonth => now.checked_add_months(Months::new(1)),
            SilenceAlertPeriod::OneYear => now.checked_add_months(Months::new(12)),
            SilenceAlertPeriod::Custom => None,
        }
    }
}

/// Resolved suppression window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SilenceWindow {
    pub silenced_after_date: Option<DateTime<Utc>>,
    pub silenced_before_date: DateTime<Utc>,
}

/// Resolve a silence request into a window, or reject it
pub fn resolve_silence_window(
    period: Option<SilenceAlertPeriod>,
    after: Option<DateTime<Utc>>,
    before: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<SilenceWindow> {
    match period {
        Some(period) if period != SilenceAlertPeriod::Custom => {
            if after.is_some() || before.is_some() {
                return Err(Error::IllegalArgument(format!(
                    "explicit dates cannot be combined with the silence period {}",
                    period
                )));
            }
            let before = period.ends_at(now).ok_or_else(|| {
                Error::IllegalArgument(format!("silence period {} overflows", period))
            })?;
            Ok(SilenceWindow {
                silenced_after_date: None,
                silenced_before_date: before,
            })
        }
        _ => {
            let before = before.ok_or_else(|| {
                Error::IllegalArgument(
                    "a silence period or an end date must be given".to_string(),
                )
            })?;
            if let Some(after) = after {
                if after >= before {
                    return Err(Error::IllegalArgument(format!(
                        "silence start {} must precede its end {}",
                        after, before
                    )));
                }
            }
            Ok(SilenceWindow {
                silenced_after_date: after,
                silenced_before_date: before,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 1, 31, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_named_period_ends_relative_to_now() {
        let window = resolve_silence_window(Some(SilenceAlertPeriod::TwoHours), None, None, now()).unwrap();

        assert_eq!(window.silenced_after_date, None);
        assert_eq!(window.silenced_before_date, now() + Duration::hours(2));
    }

    #[test]
    fn test_one_month_clamps_to_month_end() {
        let window = resolve_silence_window(Some(SilenceAlertPeriod::OneMonth), None, None, now()).unwrap();

        assert_eq!(
            window.silenced_before_date,
            Utc.with_ymd_and_hms(2022, 2, 28, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_explicit_bounds_without_period() {
        let after = now() + Duration::hours(1);
        let before = now() + Duration::days(3);

        let window = resolve_silence_window(None, Some(after), Some(before), now()).unwrap();

        assert_eq!(window.silenced_after_date, Some(after));
        assert_eq!(window.silenced_before_date, before);
    }

    #[test]
    fn test_custom_with_only_end_date() {
        let before = now() + Duration::days(3);

        let window =
            resolve_silence_window(Some(SilenceAlertPeriod::Custom), None, Some(before), now()).unwrap();

        assert_eq!(window.silenced_after_date, None);
        assert_eq!(window.silenced_before_date, before);
    }

    #[test]
    fn test_rejected_combinations() {
        let later = now() + Duration::hours(5);

        assert!(resolve_silence_window(None, None, None, now()).is_err());
        assert!(resolve_silence_window(None, Some(later), None, now()).is_err());
        assert!(resolve_silence_window(Some(SilenceAlertPeriod::Custom), None, None, now()).is_err());
        assert!(resolve_silence_window(Some(SilenceAlertPeriod::OneDay), None, Some(later), now()).is_err());
        assert!(resolve_silence_window(None, Some(later), Some(now()), now()).is_err());
    }
}
