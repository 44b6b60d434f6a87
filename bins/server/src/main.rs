//! Furlough API Server
//!
//! Main entry point for the leave administration service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use furlough_api::{AppState, create_router};
use furlough_core::policy::{HolidayCalendar, LeaveType, PolicyStore, policy_year_containing};
use furlough_shared::{AppConfig, LeaveConfig};
use furlough_store::collaborators::{
    ChannelNotifier, EmployeeDirectory, InMemoryAuditLog, InMemoryDirectory, NotificationEvent,
};
use furlough_store::{Clock, Collaborators, LeaveSystem, SystemClock};

const NOTIFICATION_BUFFER: usize = 1024;
const ESCALATION_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "furlough=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().context("failed to load configuration")?;

    // Policies and directory fixtures
    let policies = Arc::new(PolicyStore::new(HolidayCalendar::new(
        config.leave.public_holidays.iter().copied(),
    )));
    load_policies(&config.leave, &policies)?;
    let directory = Arc::new(load_directory(&config.leave)?);

    // Collaborators
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let (notifier, notifications) = ChannelNotifier::new(NOTIFICATION_BUFFER);
    tokio::spawn(log_notifications(notifications));
    let collaborators = Collaborators {
        directory: directory.clone(),
        notifier: Arc::new(notifier),
        audit: Arc::new(InMemoryAuditLog::new()),
        clock: Arc::clone(&clock),
    };

    let system = LeaveSystem::new(&config.leave, Arc::clone(&policies), collaborators);
    enroll_all(&system, directory.as_ref(), &policies, clock.as_ref()).await?;

    // Background jobs
    Arc::clone(&system.scheduler).spawn(Duration::from_secs(config.leave.accrual_interval_secs));
    spawn_escalation(&system, Arc::clone(&clock));
    info!(
        interval_secs = config.leave.accrual_interval_secs,
        sla_hours = config.leave.escalation_sla_hours,
        "Background jobs started"
    );

    // Create router
    let app = create_router(AppState::new(&system, clock));

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn load_policies(config: &LeaveConfig, policies: &PolicyStore) -> anyhow::Result<()> {
    let Some(path) = &config.policy_file else {
        warn!("No policy file configured; starting without leave types");
        return Ok(());
    };
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let leave_types: Vec<LeaveType> =
        serde_json::from_str(&raw).with_context(|| format!("parsing {path}"))?;
    for leave_type in leave_types {
        let code = leave_type.code.clone();
        let version = policies
            .publish(leave_type)
            .with_context(|| format!("publishing leave type {code}"))?;
        info!(%code, version, "Leave type published");
    }
    Ok(())
}

fn load_directory(config: &LeaveConfig) -> anyhow::Result<InMemoryDirectory> {
    let Some(path) = &config.directory_file else {
        warn!("No directory file configured; starting with an empty directory");
        return Ok(InMemoryDirectory::default());
    };
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    InMemoryDirectory::from_json(&raw).with_context(|| format!("parsing {path}"))
}

/// Enrolls every active employee in every leave type from the current policy year.
async fn enroll_all(
    system: &LeaveSystem,
    directory: &dyn EmployeeDirectory,
    policies: &PolicyStore,
    clock: &dyn Clock,
) -> anyhow::Result<()> {
    let today = clock.today();
    let employees = directory.employees().await?;
    let leave_types = policies.leave_types();
    for employee in employees.iter().filter(|employee| employee.active) {
        for leave_type in &leave_types {
            let year = policy_year_containing(today, leave_type.policy_year_start_month)?;
            system
                .scheduler
                .enroll(employee.id, leave_type.id, year.start)
                .await
                .with_context(|| format!("enrolling {} in {}", employee.id, leave_type.code))?;
        }
    }
    info!(
        employees = employees.len(),
        leave_types = leave_types.len(),
        enrolled = system.scheduler.enrolled(),
        "Accrual enrollments loaded"
    );
    Ok(())
}

fn spawn_escalation(system: &LeaveSystem, clock: Arc<dyn Clock>) {
    let service = Arc::clone(&system.service);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(ESCALATION_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let escalated = service.escalate_overdue(clock.now()).await;
            if !escalated.is_empty() {
                info!(count = escalated.len(), "Overdue requests escalated");
            }
        }
    });
}

async fn log_notifications(mut notifications: mpsc::Receiver<NotificationEvent>) {
    while let Some(event) = notifications.recv().await {
        match serde_json::to_string(&event) {
            Ok(payload) => info!(target: "furlough::notifications", %payload, "Notification"),
            Err(e) => warn!(error = %e, "Notification could not be encoded"),
        }
    }
}
