//! Leave type policy engine.
//!
//! - Versioned leave type definitions and their invariants
//! - Eligibility rules interpreted against employee profiles
//! - Day counting against the holiday calendar
//! - Policy-year and accrual-period arithmetic

pub mod calendar;
pub mod eligibility;
pub mod error;
pub mod store;
pub mod types;

pub use calendar::{
    DayPeriod, HolidayCalendar, accrual_period_containing, is_weekend, next_accrual_period,
    policy_year_containing,
};
pub use eligibility::{EligibilityOutcome, EligibilityRule};
pub use error::PolicyError;
pub use store::PolicyStore;
pub use types::{
    AccrualFrequency, AccrualMethod, ApprovalRequirements, BlackoutPeriod, CarryForwardPolicy,
    CashOutPolicy, DateRange, DayCountingRule, LeaveCategory, LeaveType, TenureBand,
};
