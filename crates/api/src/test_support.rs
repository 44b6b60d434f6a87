//! Router fixture for handler tests.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use chrono::{NaiveDate, TimeZone, Utc};
use http_body_util::BodyExt;
use rust_decimal_macros::dec;
use serde_json::Value;
use tower::ServiceExt;

use furlough_core::employee::{EmployeeProfile, EmploymentType};
use furlough_core::policy::{DayCountingRule, HolidayCalendar, LeaveType, PolicyStore};
use furlough_shared::types::{DepartmentId, Days, EmployeeId, LeaveTypeId};
use furlough_shared::{CoverageConfig, LeaveConfig};
use furlough_store::collaborators::{ChannelNotifier, InMemoryAuditLog, InMemoryDirectory};
use furlough_store::{Collaborators, FixedClock, LeaveSystem};

use crate::{AppState, create_router};

pub struct Fixture {
    pub state: AppState,
    pub employee: EmployeeId,
    pub manager: EmployeeId,
    pub leave_type: LeaveTypeId,
}

fn profile(department: DepartmentId, manager: Option<EmployeeId>) -> EmployeeProfile {
    EmployeeProfile {
        id: EmployeeId::new(),
        name: "Employee".to_string(),
        department_id: department,
        hire_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        employment_type: EmploymentType::FullTime,
        jurisdiction: "AU-NSW".to_string(),
        manager_id: manager,
        auto_approval_delegated: false,
        approver_roles: Vec::new(),
        active: true,
    }
}

/// An employee with ten days of annual leave and a manager, on Monday 2026-03-02.
pub async fn fixture() -> Fixture {
    let config = LeaveConfig {
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
    };
    let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()));
    let policies = Arc::new(PolicyStore::new(HolidayCalendar::default()));
    let leave_type = LeaveType::new("ANNUAL", "Annual Leave", DayCountingRule::WORKING_DAYS);
    let leave_type_id = leave_type.id;
    policies.publish(leave_type).unwrap();

    let management = DepartmentId::new();
    let team = DepartmentId::new();
    let manager = profile(management, None);
    let employee = profile(team, Some(manager.id));
    let teammates: Vec<EmployeeProfile> = (0..4).map(|_| profile(team, Some(manager.id))).collect();
    let directory = Arc::new(InMemoryDirectory::new(
        [manager.clone(), employee.clone()].into_iter().chain(teammates),
    ));

    let (notifier, _notifications) = ChannelNotifier::new(64);
    let collaborators = Collaborators {
        directory,
        notifier: Arc::new(notifier),
        audit: Arc::new(InMemoryAuditLog::new()),
        clock: clock.clone(),
    };
    let system = LeaveSystem::new(&config, policies, collaborators);
    system
        .ledger
        .adjust(employee.id, leave_type_id, Days::whole(10), "opening balance", manager.id)
        .await
        .unwrap();

    Fixture {
        state: AppState::new(&system, clock),
        employee: employee.id,
        manager: manager.id,
        leave_type: leave_type_id,
    }
}

pub fn app(fixture: &Fixture) -> Router {
    create_router(fixture.state.clone())
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

/// Sends a request and returns the status with the parsed JSON body.
pub async fn send(app: Router, request: Request<Body>) -> (u16, Value) {
    let response: Response<Body> = app.oneshot(request).await.unwrap();
    let status = response.status().as_u16();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}
