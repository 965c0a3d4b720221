//! Background email jobs, CSV exports and the interval scheduler.
//!
//! Jobs are plain async functions over a connection and an `EmailSender`.
//! A failing recipient is logged and counted; the run carries on.

pub mod export;
pub mod reminders;
pub mod reports;
pub mod scheduler;

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::errors::ServiceError;
use crate::mail::templates::TestEmail;
use crate::mail::{EmailMessage, EmailSender};

pub use export::{ExportStatus, ExportStore};
pub use reminders::send_daily_reminders;
pub use reports::{send_monthly_reports, send_monthly_reports_at};
pub use scheduler::{Scheduler, SchedulerConfig};

/// Outcome of one job run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct JobSummary {
    pub sent: usize,
    pub failed: usize,
}

impl JobSummary {
    /// Send one message and count the outcome.
    pub(crate) async fn deliver(&mut self, mailer: &dyn EmailSender, msg: EmailMessage) {
        let to = msg.to.clone();
        match mailer.send(msg).await {
            Ok(()) => {
                self.sent += 1;
                common::metrics::record_email(true);
            }
            Err(e) => {
                self.failed += 1;
                common::metrics::record_email(false);
                warn!(recipient = %to, error = %e, event = "email_failed", "failed to send email");
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    DailyReminders,
    MonthlyReports,
    TestEmail,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DailyReminders => "daily_reminders",
            Self::MonthlyReports => "monthly_reports",
            Self::TestEmail => "test_email",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub async fn send_test_email(mailer: &dyn EmailSender, to: &str) -> JobSummary {
    let mut summary = JobSummary::default();
    summary.deliver(mailer, TestEmail { to }.render()).await;
    summary
}

/// Everything a job run needs, cheap to clone into spawned tasks.
#[derive(Clone)]
pub struct JobContext {
    pub db: sea_orm::DatabaseConnection,
    pub mailer: Arc<dyn EmailSender>,
    pub test_recipient: String,
}

impl JobContext {
    /// Run `kind` once, recording the outcome in metrics and logs.
    pub async fn run(&self, kind: JobKind) -> Result<JobSummary, ServiceError> {
        let result = match kind {
            JobKind::DailyReminders => send_daily_reminders(&self.db, self.mailer.as_ref()).await,
            JobKind::MonthlyReports => send_monthly_reports(&self.db, self.mailer.as_ref()).await,
            JobKind::TestEmail => Ok(send_test_email(self.mailer.as_ref(), &self.test_recipient).await),
        };
        match &result {
            Ok(summary) => {
                common::metrics::record_job(kind.as_str(), true);
                info!(job = %kind, sent = summary.sent, failed = summary.failed, event = "job_finished", "job finished");
            }
            Err(e) => {
                common::metrics::record_job(kind.as_str(), false);
                warn!(job = %kind, error = %e, event = "job_failed", "job failed");
            }
        }
        result
    }

    /// Fire-and-forget run; returns a task id for correlation in logs.
    pub fn spawn(&self, kind: JobKind) -> String {
        let task_id = uuid::Uuid::new_v4().to_string();
        let ctx = self.clone();
        let id = task_id.clone();
        tokio::spawn(async move {
            info!(job = %kind, task_id = %id, event = "job_started", "job triggered");
            let _ = ctx.run(kind).await;
        });
        task_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::FakeEmailSender;
    use crate::test_support::get_db;

    #[tokio::test]
    async fn test_email_goes_to_configured_recipient() -> Result<(), anyhow::Error> {
        let fake = Arc::new(FakeEmailSender::new());
        let ctx = JobContext { db: get_db().await?, mailer: fake.clone(), test_recipient: "ops@example.com".into() };
        let summary = ctx.run(JobKind::TestEmail).await?;
        assert_eq!(summary, JobSummary { sent: 1, failed: 0 });
        let msg = fake.last_message().unwrap();
        assert_eq!(msg.to, "ops@example.com");
        assert_eq!(msg.subject, "Test Email from Fixrify");
        Ok(())
    }

    #[tokio::test]
    async fn failed_delivery_is_counted() {
        let fake = FakeEmailSender::failing_for(&["ops@example.com"]);
        let summary = send_test_email(&fake, "ops@example.com").await;
        assert_eq!(summary, JobSummary { sent: 0, failed: 1 });
    }
}
