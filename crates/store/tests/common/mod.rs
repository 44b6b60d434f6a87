//! Shared fixture for store integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;
use tokio::sync::mpsc;

use furlough_core::employee::{EmployeeProfile, EmploymentType};
use furlough_core::policy::{AccrualFrequency, AccrualMethod, DayCountingRule, DayPeriod, HolidayCalendar, LeaveType, PolicyStore};
use furlough_core::workflow::{ApproverRole, LeaveRequestInput, Priority};
use furlough_shared::types::{DepartmentId, Days, EmployeeId, LeaveTypeId};
use furlough_shared::{CoverageConfig, LeaveConfig};
use furlough_store::collaborators::{ChannelNotifier, InMemoryAuditLog, InMemoryDirectory, NotificationEvent};
use furlough_store::{Collaborators, FixedClock, LeaveSystem};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn leave_config() -> LeaveConfig {
    LeaveConfig {
        coverage: CoverageConfig {
            warning_percent: dec!(30),
            critical_percent: dec!(50),
        },
        escalation_sla_hours: 48,
        lock_timeout_ms: 2_000,
        max_lock_retries: 3,
        accrual_interval_secs: 3600,
        policy_file: None,
        directory_file: None,
        public_holidays: Vec::new(),
    }
}

/// Working-day annual leave, manager approval, no notice.
pub fn annual_leave() -> LeaveType {
    let mut leave_type = LeaveType::new("ANNUAL", "Annual Leave", DayCountingRule::WORKING_DAYS);
    leave_type.accrual_method = AccrualMethod::Fixed;
    leave_type.accrual_rate = Days::new(dec!(1.5));
    leave_type.accrual_frequency = AccrualFrequency::Monthly;
    leave_type
}

pub struct TestEnv {
    pub system: LeaveSystem,
    pub policies: Arc<PolicyStore>,
    pub directory: Arc<InMemoryDirectory>,
    pub audit: Arc<InMemoryAuditLog>,
    pub clock: Arc<FixedClock>,
    pub notifications: mpsc::Receiver<NotificationEvent>,
    /// The team requests are analysed against.
    pub department: DepartmentId,
    /// Manager of every team member; lives outside the team.
    pub manager: EmployeeProfile,
    pub hr: EmployeeProfile,
    pub director: EmployeeProfile,
    pub hr_admin: EmployeeId,
}

impl TestEnv {
    /// Clock at Monday 2026-03-02 09:00 UTC.
    pub fn new() -> Self {
        Self::with_config(&leave_config())
    }

    pub fn with_config(config: &LeaveConfig) -> Self {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()));
        let policies = Arc::new(PolicyStore::new(HolidayCalendar::default()));
        let directory = Arc::new(InMemoryDirectory::default());
        let audit = Arc::new(InMemoryAuditLog::new());
        let (notifier, notifications) = ChannelNotifier::new(4096);

        let management = DepartmentId::new();
        let director = profile(management, None, vec![ApproverRole::Director]);
        let hr = profile(management, Some(director.id), vec![ApproverRole::Hr]);
        let manager = profile(management, Some(director.id), Vec::new());
        for p in [&director, &hr, &manager] {
            directory.upsert(p.clone());
        }

        let collaborators = Collaborators {
            directory: directory.clone(),
            notifier: Arc::new(notifier),
            audit: audit.clone(),
            clock: clock.clone(),
        };
        let system = LeaveSystem::new(config, Arc::clone(&policies), collaborators);
        Self {
            system,
            policies,
            directory,
            audit,
            clock,
            notifications,
            department: DepartmentId::new(),
            hr_admin: hr.id,
            manager,
            hr,
            director,
        }
    }

    pub fn publish(&self, leave_type: LeaveType) -> Arc<LeaveType> {
        let id = leave_type.id;
        self.policies.publish(leave_type).unwrap();
        self.policies.get_leave_type(id).unwrap()
    }

    /// Adds a team member reporting to the manager.
    pub fn add_employee(&self) -> EmployeeProfile {
        let employee = profile(self.department, Some(self.manager.id), Vec::new());
        self.directory.upsert(employee.clone());
        employee
    }

    pub fn add_team(&self, size: usize) -> Vec<EmployeeProfile> {
        (0..size).map(|_| self.add_employee()).collect()
    }

    pub fn delegate_auto_approval(&self) {
        let mut manager = self.manager.clone();
        manager.auto_approval_delegated = true;
        self.directory.upsert(manager);
    }

    pub async fn grant(&self, employee: EmployeeId, leave_type: LeaveTypeId, days: i64) {
        self.system
            .ledger
            .adjust(employee, leave_type, Days::whole(days), "opening balance", self.hr.id)
            .await
            .unwrap();
    }

    pub fn drain_notifications(&mut self) -> Vec<NotificationEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.notifications.try_recv() {
            events.push(event);
        }
        events
    }
}

pub fn profile(department: DepartmentId, manager: Option<EmployeeId>, roles: Vec<ApproverRole>) -> EmployeeProfile {
    EmployeeProfile {
        id: EmployeeId::new(),
        name: "Employee".to_string(),
        department_id: department,
        hire_date: date(2024, 1, 15),
        employment_type: EmploymentType::FullTime,
        jurisdiction: "AU-NSW".to_string(),
        manager_id: manager,
        auto_approval_delegated: false,
        approver_roles: roles,
        active: true,
    }
}

pub fn input(employee: EmployeeId, leave_type: LeaveTypeId, start: NaiveDate, end: NaiveDate) -> LeaveRequestInput {
    LeaveRequestInput {
        employee_id: employee,
        leave_type_id: leave_type,
        start_date: start,
        end_date: end,
        start_period: DayPeriod::Full,
        end_period: DayPeriod::Full,
        reason: Some("time off".to_string()),
        emergency: false,
        emergency_justification: None,
        priority: Priority::Normal,
        conflict_override: None,
    }
}
