//! Holiday calendar, day counting and policy-year arithmetic.

use std::collections::BTreeSet;

use chrono::{Datelike, Days as CalendarDays, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use furlough_shared::types::Days;

use super::error::PolicyError;
use super::types::{AccrualFrequency, DateRange, DayCountingRule};

/// Whether a request starts or ends on a full or a half day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayPeriod {
    /// The whole day is taken.
    #[default]
    Full,
    /// Half of the day is taken.
    Half,
}

/// Public holidays honoured by day counting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidayCalendar {
    holidays: BTreeSet<NaiveDate>,
}

impl HolidayCalendar {
    /// Builds a calendar from a list of holiday dates.
    pub fn new(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }

    /// Returns true if `date` is a public holiday.
    #[must_use]
    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    /// Holidays falling within `range`.
    pub fn holidays_in<'a>(&'a self, range: &DateRange) -> impl Iterator<Item = NaiveDate> + 'a {
        self.holidays.range(range.start..=range.end).copied()
    }

    /// Returns true if `date` consumes leave under `rule`.
    #[must_use]
    pub fn is_chargeable(&self, date: NaiveDate, rule: DayCountingRule) -> bool {
        if !rule.count_weekends && is_weekend(date) {
            return false;
        }
        if !rule.count_public_holidays && self.is_holiday(date) {
            return false;
        }
        true
    }

    /// Chargeable days in `range`.
    ///
    /// A half period on the first or last day subtracts half a day when that
    /// day is itself chargeable. A single-day request with either period half
    /// counts half a day.
    #[must_use]
    pub fn count_chargeable_days(
        &self,
        range: &DateRange,
        start_period: DayPeriod,
        end_period: DayPeriod,
        rule: DayCountingRule,
    ) -> Days {
        if range.start == range.end {
            if !self.is_chargeable(range.start, rule) {
                return Days::ZERO;
            }
            return if start_period == DayPeriod::Half || end_period == DayPeriod::Half {
                Days::HALF
            } else {
                Days::ONE
            };
        }

        let mut total: Days = range
            .dates()
            .filter(|date| self.is_chargeable(*date, rule))
            .map(|_| Days::ONE)
            .sum();

        if start_period == DayPeriod::Half && self.is_chargeable(range.start, rule) {
            total -= Days::HALF;
        }
        if end_period == DayPeriod::Half && self.is_chargeable(range.end, rule) {
            total -= Days::HALF;
        }
        total
    }
}

/// Saturday or Sunday.
#[must_use]
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The policy year containing `date` for a year starting in `start_month`.
///
/// # Errors
///
/// Returns `PolicyError::InvalidPolicy` when `start_month` is not a month.
pub fn policy_year_containing(date: NaiveDate, start_month: u32) -> Result<DateRange, PolicyError> {
    let year = if date.month() >= start_month {
        date.year()
    } else {
        date.year() - 1
    };
    let start = NaiveDate::from_ymd_opt(year, start_month, 1).ok_or_else(|| {
        PolicyError::InvalidPolicy(format!("policy year start month {start_month} is not a month"))
    })?;
    let end = add_months(start, 12)?.pred_opt().ok_or_else(out_of_range)?;
    Ok(DateRange { start, end })
}

/// The accrual period containing `date`, aligned to the policy year.
///
/// # Errors
///
/// Returns `PolicyError::InvalidPolicy` when `start_month` is not a month.
pub fn accrual_period_containing(
    date: NaiveDate,
    frequency: AccrualFrequency,
    start_month: u32,
) -> Result<DateRange, PolicyError> {
    let year = policy_year_containing(date, start_month)?;
    let months_into_year = (i64::from(date.year()) - i64::from(year.start.year())) * 12
        + i64::from(date.month())
        - i64::from(year.start.month());
    let step = i64::from(frequency.months());
    let offset = u32::try_from(months_into_year / step * step).map_err(|_| out_of_range())?;

    let start = add_months(year.start, offset)?;
    let end = add_months(start, frequency.months())?
        .pred_opt()
        .ok_or_else(out_of_range)?;
    Ok(DateRange { start, end })
}

/// The accrual period immediately after `period`.
///
/// # Errors
///
/// Returns `PolicyError::InvalidPolicy` when `start_month` is not a month.
pub fn next_accrual_period(
    period: &DateRange,
    frequency: AccrualFrequency,
    start_month: u32,
) -> Result<DateRange, PolicyError> {
    let next_day = period
        .end
        .checked_add_days(CalendarDays::new(1))
        .ok_or_else(out_of_range)?;
    accrual_period_containing(next_day, frequency, start_month)
}

fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate, PolicyError> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(out_of_range)
}

fn out_of_range() -> PolicyError {
    PolicyError::InvalidPolicy("date arithmetic out of range".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn range(start: NaiveDate, end: NaiveDate) -> DateRange {
        DateRange::new(start, end).unwrap()
    }

    fn calendar() -> HolidayCalendar {
        // 2026-04-03 is Good Friday, 2026-04-06 Easter Monday.
        HolidayCalendar::new([date(2026, 4, 3), date(2026, 4, 6)])
    }

    #[rstest]
    // Mon..Fri, plain working week.
    #[case(date(2026, 3, 2), date(2026, 3, 6), DayPeriod::Full, DayPeriod::Full, DayCountingRule::WORKING_DAYS, dec!(5))]
    // Mon..Sun, weekend skipped.
    #[case(date(2026, 3, 2), date(2026, 3, 8), DayPeriod::Full, DayPeriod::Full, DayCountingRule::WORKING_DAYS, dec!(5))]
    // Same span counting calendar days.
    #[case(date(2026, 3, 2), date(2026, 3, 8), DayPeriod::Full, DayPeriod::Full, DayCountingRule::CALENDAR_DAYS, dec!(7))]
    // Easter: Thu..Tue minus two holidays and a weekend.
    #[case(date(2026, 4, 2), date(2026, 4, 7), DayPeriod::Full, DayPeriod::Full, DayCountingRule::WORKING_DAYS, dec!(2))]
    // Half days at both ends.
    #[case(date(2026, 3, 2), date(2026, 3, 6), DayPeriod::Half, DayPeriod::Half, DayCountingRule::WORKING_DAYS, dec!(4))]
    // Half period on a non-chargeable end date is ignored.
    #[case(date(2026, 3, 2), date(2026, 3, 7), DayPeriod::Full, DayPeriod::Half, DayCountingRule::WORKING_DAYS, dec!(5))]
    // Single half day.
    #[case(date(2026, 3, 4), date(2026, 3, 4), DayPeriod::Full, DayPeriod::Half, DayCountingRule::WORKING_DAYS, dec!(0.5))]
    // Single day on a holiday.
    #[case(date(2026, 4, 3), date(2026, 4, 3), DayPeriod::Full, DayPeriod::Full, DayCountingRule::WORKING_DAYS, dec!(0))]
    fn test_count_chargeable_days(
        #[case] start: NaiveDate,
        #[case] end: NaiveDate,
        #[case] start_period: DayPeriod,
        #[case] end_period: DayPeriod,
        #[case] rule: DayCountingRule,
        #[case] expected: rust_decimal::Decimal,
    ) {
        let days = calendar().count_chargeable_days(&range(start, end), start_period, end_period, rule);
        assert_eq!(days, Days::new(expected));
    }

    #[test]
    fn test_holidays_in_range() {
        let found: Vec<_> = calendar()
            .holidays_in(&range(date(2026, 4, 1), date(2026, 4, 4)))
            .collect();
        assert_eq!(found, vec![date(2026, 4, 3)]);
    }

    #[rstest]
    #[case(date(2026, 5, 15), 1, date(2026, 1, 1), date(2026, 12, 31))]
    #[case(date(2026, 5, 15), 7, date(2025, 7, 1), date(2026, 6, 30))]
    #[case(date(2026, 7, 1), 7, date(2026, 7, 1), date(2027, 6, 30))]
    fn test_policy_year(
        #[case] on: NaiveDate,
        #[case] start_month: u32,
        #[case] start: NaiveDate,
        #[case] end: NaiveDate,
    ) {
        assert_eq!(policy_year_containing(on, start_month).unwrap(), range(start, end));
    }

    #[rstest]
    #[case(date(2026, 2, 10), AccrualFrequency::Monthly, 1, date(2026, 2, 1), date(2026, 2, 28))]
    #[case(date(2026, 5, 10), AccrualFrequency::Quarterly, 1, date(2026, 4, 1), date(2026, 6, 30))]
    #[case(date(2026, 5, 10), AccrualFrequency::Quarterly, 7, date(2026, 4, 1), date(2026, 6, 30))]
    #[case(date(2026, 8, 10), AccrualFrequency::Quarterly, 7, date(2026, 7, 1), date(2026, 9, 30))]
    #[case(date(2026, 8, 10), AccrualFrequency::Yearly, 7, date(2026, 7, 1), date(2027, 6, 30))]
    fn test_accrual_period(
        #[case] on: NaiveDate,
        #[case] frequency: AccrualFrequency,
        #[case] start_month: u32,
        #[case] start: NaiveDate,
        #[case] end: NaiveDate,
    ) {
        assert_eq!(
            accrual_period_containing(on, frequency, start_month).unwrap(),
            range(start, end)
        );
    }

    #[test]
    fn test_next_accrual_period_crosses_year() {
        let december = range(date(2026, 12, 1), date(2026, 12, 31));
        let next = next_accrual_period(&december, AccrualFrequency::Monthly, 1).unwrap();
        assert_eq!(next, range(date(2027, 1, 1), date(2027, 1, 31)));
    }

    #[test]
    fn test_invalid_start_month() {
        assert!(policy_year_containing(date(2026, 1, 1), 0).is_err());
    }
}
