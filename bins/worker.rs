//! Background job runner: daily reminders and monthly reports on fixed
//! intervals, without the HTTP API.
use dotenvy::dotenv;
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    dotenv().ok();
    common::utils::logging::init_logging_from_env();

    let cfg = match configs::AppConfig::load_and_validate() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(service = "worker", event = "config_invalid", error = %e, "failed to load configuration");
            return std::process::ExitCode::FAILURE;
        }
    };
    info!(
        service = "worker",
        event = "start",
        reminders_secs = cfg.jobs.daily_reminder_interval_secs,
        reports_secs = cfg.jobs.monthly_report_interval_secs,
        "worker starting"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut worker = tokio::spawn(server::run_worker(cfg, shutdown_rx));
    tokio::select! {
        res = &mut worker => {
            if let Ok(Err(e)) = &res {
                error!(service = "worker", event = "run_failed", error = %e, "worker stopped with error");
            }
            return match res {
                Ok(Ok(())) => std::process::ExitCode::SUCCESS,
                _ => std::process::ExitCode::FAILURE,
            };
        }
        _ = tokio::signal::ctrl_c() => {
            info!(service = "worker", event = "shutdown_signal", "received Ctrl+C, shutting down");
            let _ = shutdown_tx.send(true);
        }
    }
    match worker.await {
        Ok(Ok(())) => std::process::ExitCode::SUCCESS,
        _ => std::process::ExitCode::FAILURE,
    }
}
