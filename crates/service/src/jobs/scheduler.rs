//! Fixed-interval job loops. The first run happens one period after start;
//! every loop exits when the shutdown channel flips to `true`.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::{JobContext, JobKind};

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub daily_reminders: Duration,
    pub monthly_reports: Duration,
}

impl From<&configs::JobsConfig> for SchedulerConfig {
    fn from(cfg: &configs::JobsConfig) -> Self {
        Self {
            daily_reminders: Duration::from_secs(cfg.daily_reminder_interval_secs),
            monthly_reports: Duration::from_secs(cfg.monthly_report_interval_secs),
        }
    }
}

pub struct Scheduler {
    ctx: JobContext,
    cfg: SchedulerConfig,
}

impl Scheduler {
    pub fn new(ctx: JobContext, cfg: SchedulerConfig) -> Self {
        Self { ctx, cfg }
    }

    /// Spawn one loop per scheduled job.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        info!(
            reminders_secs = self.cfg.daily_reminders.as_secs(),
            reports_secs = self.cfg.monthly_reports.as_secs(),
            "starting job scheduler"
        );
        [(JobKind::DailyReminders, self.cfg.daily_reminders), (JobKind::MonthlyReports, self.cfg.monthly_reports)]
            .into_iter()
            .map(|(kind, period)| tokio::spawn(run_every(self.ctx.clone(), kind, period, shutdown.clone())))
            .collect()
    }
}

/// Run `kind` every `period` until shutdown.
pub async fn run_every(ctx: JobContext, kind: JobKind, period: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                debug!(job = %kind, "scheduled run");
                let _ = ctx.run(kind).await;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    info!(job = %kind, "job loop stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::mail::FakeEmailSender;
    use crate::test_support::get_db;

    #[tokio::test]
    async fn loop_waits_one_period_and_stops_on_shutdown() -> Result<(), anyhow::Error> {
        let fake = Arc::new(FakeEmailSender::new());
        let ctx = JobContext { db: get_db().await?, mailer: fake.clone(), test_recipient: "ops@example.com".into() };
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run_every(ctx, JobKind::TestEmail, Duration::from_millis(150), rx));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(fake.sent_messages().is_empty(), "no run before the first period");

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!fake.sent_messages().is_empty());

        tx.send(true)?;
        tokio::time::timeout(Duration::from_secs(2), handle).await??;
        Ok(())
    }
}
