//! Leave type definitions.
//!
//! A `LeaveType` is an immutable, versioned policy. Rule bags are explicit
//! structured types rather than free-form JSON.

use chrono::{Days as CalendarDays, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use furlough_shared::types::{Days, LeaveTypeId};

use super::eligibility::EligibilityRule;
use super::error::PolicyError;

/// Statutory leave is mandated by law; discretionary leave is company policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveCategory {
    /// Mandated by legislation.
    Statutory,
    /// Granted by company policy.
    Discretionary,
}

/// How the per-period accrual amount is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccrualMethod {
    /// The full rate every period.
    Fixed,
    /// The rate scaled by the share of the period the employee was employed.
    Prorated,
    /// The rate of the highest tenure band the employee has reached.
    TenureBased,
}

/// Accrual posting frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccrualFrequency {
    /// Once per calendar month.
    Monthly,
    /// Once per calendar quarter.
    Quarterly,
    /// Once per policy year.
    Yearly,
}

impl AccrualFrequency {
    /// Length of one accrual period in months.
    #[must_use]
    pub const fn months(self) -> u32 {
        match self {
            Self::Monthly => 1,
            Self::Quarterly => 3,
            Self::Yearly => 12,
        }
    }
}

/// Accrual rate applying once the employee reaches a service threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenureBand {
    /// Completed months of service required.
    pub min_service_months: u32,
    /// Days accrued per period in this band.
    pub rate: Days,
}

/// Year-end carry-forward rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarryForwardPolicy {
    /// Whether unused balance may roll into the next policy year.
    pub enabled: bool,
    /// Upper bound on carried days.
    pub max_days: Days,
    /// Carried days lapse this many months into the new year.
    pub expiry_months: Option<u32>,
}

/// Encashment rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashOutPolicy {
    /// Whether available days may be cashed out.
    pub eligible: bool,
    /// Share of a day's pay paid per cashed-out day.
    pub rate: Decimal,
}

/// Which roles must sign off a request of this type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequirements {
    /// Direct manager approval.
    pub manager: bool,
    /// HR approval.
    pub hr: bool,
    /// Director approval.
    pub director: bool,
}

/// Which calendar days a request consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCountingRule {
    /// Saturdays and Sundays are charged.
    pub count_weekends: bool,
    /// Public holidays are charged.
    pub count_public_holidays: bool,
}

impl DayCountingRule {
    /// Only working days are charged.
    pub const WORKING_DAYS: Self = Self {
        count_weekends: false,
        count_public_holidays: false,
    };

    /// Every calendar day is charged.
    pub const CALENDAR_DAYS: Self = Self {
        count_weekends: true,
        count_public_holidays: true,
    };
}

/// Inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// First date (inclusive).
    pub start: NaiveDate,
    /// Last date (inclusive).
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a range, rejecting `end < start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, PolicyError> {
        if end < start {
            return Err(PolicyError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// A range covering one day.
    #[must_use]
    pub const fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// Returns true if `date` falls within the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Returns true if the two ranges share at least one date.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Dates shared by both ranges.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        self.overlaps(other).then(|| Self {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        })
    }

    /// Number of calendar dates in the range.
    #[must_use]
    pub fn calendar_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Calendar days strictly between the two ranges (0 when they touch or overlap).
    #[must_use]
    pub fn gap_days(&self, other: &Self) -> i64 {
        if self.overlaps(other) {
            return 0;
        }
        let (earlier, later) = if self.end < other.start {
            (self, other)
        } else {
            (other, self)
        };
        ((later.start - earlier.end).num_days() - 1).max(0)
    }

    /// Iterates every date in the range.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        let mut next = Some(self.start);
        std::iter::from_fn(move || {
            let current = next?;
            next = if current < self.end {
                current.checked_add_days(CalendarDays::new(1))
            } else {
                None
            };
            Some(current)
        })
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// A named period during which the leave type cannot be taken without override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlackoutPeriod {
    /// Label shown to approvers (e.g. "Year-end close").
    pub name: String,
    /// Blocked dates.
    pub range: DateRange,
}

/// A versioned leave policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveType {
    /// Stable identifier across versions.
    pub id: LeaveTypeId,
    /// Assigned by the policy store on publish.
    #[serde(default)]
    pub version: u32,
    /// Short code (e.g. "ANNUAL").
    pub code: String,
    /// Display name.
    pub name: String,
    /// Statutory or discretionary.
    pub category: LeaveCategory,
    /// How accruals are computed.
    pub accrual_method: AccrualMethod,
    /// Days accrued per period (base rate for tenure-based types).
    pub accrual_rate: Days,
    /// Accrual period length.
    pub accrual_frequency: AccrualFrequency,
    /// Tenure bands for `TenureBased` accrual.
    #[serde(default)]
    pub tenure_bands: Vec<TenureBand>,
    /// Maximum banked balance; accruals stop at the cap.
    pub accrual_cap: Option<Days>,
    /// Year-end carry-forward rules.
    #[serde(default)]
    pub carry_forward: CarryForwardPolicy,
    /// Unused days beyond the carry-forward limit are forfeited at year end.
    #[serde(default)]
    pub use_it_or_lose_it: bool,
    /// Encashment rules.
    #[serde(default)]
    pub cash_out: CashOutPolicy,
    /// Days of notice required before the start date.
    #[serde(default)]
    pub min_notice_days: u32,
    /// Minimum calendar days between two requests of this type.
    pub min_gap_days: Option<u32>,
    /// Longest single request in chargeable days.
    pub max_consecutive_days: Option<Days>,
    /// Longest request duration in chargeable days.
    pub max_duration_days: Option<Days>,
    /// Blocked date ranges.
    #[serde(default)]
    pub blackout_periods: Vec<BlackoutPeriod>,
    /// Approval steps.
    #[serde(default)]
    pub approval: ApprovalRequirements,
    /// Requests up to this many days may be auto-approved.
    pub auto_approve_threshold_days: Option<Days>,
    /// Eligibility rules; all must pass.
    #[serde(default)]
    pub eligibility: Vec<EligibilityRule>,
    /// Weekend and holiday counting.
    pub day_counting: DayCountingRule,
    /// First month (1-12) of the policy year.
    #[serde(default = "default_policy_year_start_month")]
    pub policy_year_start_month: u32,
    /// Requests longer than this need a medical certificate.
    pub medical_certificate_after_days: Option<Days>,
    /// Available balance below this triggers a low-balance notification.
    #[serde(default)]
    pub low_balance_threshold: Days,
}

fn default_policy_year_start_month() -> u32 {
    1
}

impl LeaveType {
    /// Creates a discretionary, non-accruing type with the given day counting rule.
    ///
    /// Callers set the remaining policy fields explicitly.
    #[must_use]
    pub fn new(code: impl Into<String>, name: impl Into<String>, day_counting: DayCountingRule) -> Self {
        Self {
            id: LeaveTypeId::new(),
            version: 0,
            code: code.into(),
            name: name.into(),
            category: LeaveCategory::Discretionary,
            accrual_method: AccrualMethod::Fixed,
            accrual_rate: Days::ZERO,
            accrual_frequency: AccrualFrequency::Monthly,
            tenure_bands: Vec::new(),
            accrual_cap: None,
            carry_forward: CarryForwardPolicy::default(),
            use_it_or_lose_it: false,
            cash_out: CashOutPolicy::default(),
            min_notice_days: 0,
            min_gap_days: None,
            max_consecutive_days: None,
            max_duration_days: None,
            blackout_periods: Vec::new(),
            approval: ApprovalRequirements {
                manager: true,
                hr: false,
                director: false,
            },
            auto_approve_threshold_days: None,
            eligibility: Vec::new(),
            day_counting,
            policy_year_start_month: default_policy_year_start_month(),
            medical_certificate_after_days: None,
            low_balance_threshold: Days::ZERO,
        }
    }

    /// Checks the definition's internal invariants.
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::InvalidPolicy` naming the violated rule.
    pub fn validate(&self) -> Result<(), PolicyError> {
        let invalid = |msg: String| Err(PolicyError::InvalidPolicy(msg));

        if self.code.trim().is_empty() {
            return invalid("leave type code is required".to_string());
        }
        if self.accrual_rate.is_negative() {
            return invalid(format!("{}: accrual rate must not be negative", self.code));
        }
        if self.tenure_bands.iter().any(|band| band.rate.is_negative()) {
            return invalid(format!("{}: tenure band rates must not be negative", self.code));
        }
        if self.accrual_cap.is_some_and(Days::is_negative) {
            return invalid(format!("{}: accrual cap must not be negative", self.code));
        }
        if self.carry_forward.max_days.is_negative() {
            return invalid(format!("{}: max carry-forward must not be negative", self.code));
        }
        if !self.use_it_or_lose_it
            && let Some(cap) = self.accrual_cap
            && self.carry_forward.max_days > cap
        {
            return invalid(format!(
                "{}: max carry-forward {} exceeds accrual cap {}",
                self.code, self.carry_forward.max_days, cap
            ));
        }
        if !(1..=12).contains(&self.policy_year_start_month) {
            return invalid(format!(
                "{}: policy year start month {} is not a month",
                self.code, self.policy_year_start_month
            ));
        }
        if self.cash_out.rate < Decimal::ZERO {
            return invalid(format!("{}: cash-out rate must not be negative", self.code));
        }
        if self
            .blackout_periods
            .iter()
            .any(|period| period.range.end < period.range.start)
        {
            return invalid(format!("{}: blackout period ends before it starts", self.code));
        }
        Ok(())
    }

    /// Blackout periods overlapping `range`.
    pub fn blackouts_overlapping<'a>(
        &'a self,
        range: &'a DateRange,
    ) -> impl Iterator<Item = &'a BlackoutPeriod> + 'a {
        self.blackout_periods
            .iter()
            .filter(move |period| period.range.overlaps(range))
    }
}
