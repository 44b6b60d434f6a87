//! Accrual amount computation.

use rust_decimal::Decimal;

use furlough_shared::types::Days;

use crate::employee::EmployeeProfile;
use crate::policy::{AccrualMethod, DateRange, LeaveType};

/// Days earned by `employee` for one accrual `period`, before capping.
///
/// Inactive employees and employees hired after the period earn nothing.
/// The result is rounded to two places with Banker's Rounding.
#[must_use]
pub fn accrual_amount(leave_type: &LeaveType, employee: &EmployeeProfile, period: &DateRange) -> Days {
    if !employee.active || employee.hire_date > period.end {
        return Days::ZERO;
    }

    let amount = match leave_type.accrual_method {
        AccrualMethod::Fixed => leave_type.accrual_rate,
        AccrualMethod::Prorated => {
            let employed_from = employee.hire_date.max(period.start);
            let employed = (period.end - employed_from).num_days() + 1;
            let total = period.calendar_days();
            if total <= 0 {
                Days::ZERO
            } else {
                leave_type.accrual_rate * (Decimal::from(employed) / Decimal::from(total))
            }
        }
        AccrualMethod::TenureBased => tenure_rate(leave_type, employee.service_months(period.end)),
    };
    amount.rounded()
}

/// Rate of the highest tenure band reached, falling back to the base rate.
#[must_use]
pub fn tenure_rate(leave_type: &LeaveType, service_months: u32) -> Days {
    leave_type
        .tenure_bands
        .iter()
        .filter(|band| band.min_service_months <= service_months)
        .max_by_key(|band| band.min_service_months)
        .map_or(leave_type.accrual_rate, |band| band.rate)
}

/// Limits `amount` so the settled balance does not exceed `cap`.
#[must_use]
pub fn cap_amount(amount: Days, cap: Option<Days>, settled: Days) -> Days {
    match cap {
        Some(cap) => amount.min((cap - settled).non_negative()),
        None => amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::employee::EmploymentType;
    use crate::policy::{DayCountingRule, TenureBand};
    use chrono::NaiveDate;
    use furlough_shared::types::{DepartmentId, EmployeeId};
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn employee(hire_date: NaiveDate) -> EmployeeProfile {
        EmployeeProfile {
            id: EmployeeId::new(),
            name: "Linus".to_string(),
            department_id: DepartmentId::new(),
            hire_date,
            employment_type: EmploymentType::FullTime,
            jurisdiction: "FI".to_string(),
            manager_id: None,
            auto_approval_delegated: false,
            approver_roles: Vec::new(),
            active: true,
        }
    }

    fn leave_type(method: AccrualMethod, rate: Decimal) -> LeaveType {
        let mut leave_type = LeaveType::new("ANNUAL", "Annual Leave", DayCountingRule::WORKING_DAYS);
        leave_type.accrual_method = method;
        leave_type.accrual_rate = Days::new(rate);
        leave_type
    }

    fn april() -> DateRange {
        DateRange::new(date(2026, 4, 1), date(2026, 4, 30)).unwrap()
    }

    #[test]
    fn test_fixed_rate() {
        let amount = accrual_amount(
            &leave_type(AccrualMethod::Fixed, dec!(1.67)),
            &employee(date(2026, 4, 20)),
            &april(),
        );
        assert_eq!(amount, Days::new(dec!(1.67)));
    }

    #[test]
    fn test_prorated_mid_period_hire() {
        // 15 of 30 days employed.
        let amount = accrual_amount(
            &leave_type(AccrualMethod::Prorated, dec!(2)),
            &employee(date(2026, 4, 16)),
            &april(),
        );
        assert_eq!(amount, Days::ONE);

        // 10 of 30 days: 0.666.. rounds to 0.67.
        let amount = accrual_amount(
            &leave_type(AccrualMethod::Prorated, dec!(2)),
            &employee(date(2026, 4, 21)),
            &april(),
        );
        assert_eq!(amount, Days::new(dec!(0.67)));
    }

    #[test]
    fn test_hired_after_period_earns_nothing() {
        let amount = accrual_amount(
            &leave_type(AccrualMethod::Fixed, dec!(1.5)),
            &employee(date(2026, 5, 1)),
            &april(),
        );
        assert_eq!(amount, Days::ZERO);
    }

    #[rstest]
    #[case(date(2026, 1, 1), dec!(1.5))]
    #[case(date(2024, 1, 1), dec!(2))]
    #[case(date(2020, 1, 1), dec!(2.5))]
    fn test_tenure_bands(#[case] hire_date: NaiveDate, #[case] expected: Decimal) {
        let mut leave_type = leave_type(AccrualMethod::TenureBased, dec!(1.5));
        leave_type.tenure_bands = vec![
            TenureBand {
                min_service_months: 60,
                rate: Days::new(dec!(2.5)),
            },
            TenureBand {
                min_service_months: 24,
                rate: Days::whole(2),
            },
        ];
        let amount = accrual_amount(&leave_type, &employee(hire_date), &april());
        assert_eq!(amount, Days::new(expected));
    }

    #[rstest]
    #[case(dec!(2), None, dec!(100), dec!(2))]
    #[case(dec!(2), Some(dec!(20)), dec!(19), dec!(1))]
    #[case(dec!(2), Some(dec!(20)), dec!(20), dec!(0))]
    #[case(dec!(2), Some(dec!(20)), dec!(25), dec!(0))]
    fn test_cap(
        #[case] amount: Decimal,
        #[case] cap: Option<Decimal>,
        #[case] settled: Decimal,
        #[case] expected: Decimal,
    ) {
        assert_eq!(
            cap_amount(Days::new(amount), cap.map(Days::new), Days::new(settled)),
            Days::new(expected)
        );
    }
}
