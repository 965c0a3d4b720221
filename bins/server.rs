use dotenvy::dotenv;
use tokio::sync::watch;
use tracing::{error, info};
use uuid::Uuid;

fn init_logging() {
    // .env first so RUST_LOG and LOG_FORMAT apply
    dotenv().ok();
    common::utils::logging::init_logging_from_env();
    info!(service = "server", event = "logger_init", "tracing subscriber initialized");
}

fn main() -> std::process::ExitCode {
    init_logging();

    let service_id = Uuid::new_v4();
    let pid = std::process::id();
    let version = env!("CARGO_PKG_VERSION");

    std::panic::set_hook(Box::new(move |info| {
        error!(service = "server", event = "panic", %service_id, pid, message = %info, "unhandled panic occurred");
    }));

    let cfg = match configs::AppConfig::load_and_validate() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(service = "server", event = "config_invalid", error = %e, "failed to load configuration");
            return std::process::ExitCode::FAILURE;
        }
    };

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(w) = cfg.server.worker_threads {
        builder.worker_threads(w);
    }
    let rt = match builder.build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "server", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return std::process::ExitCode::FAILURE;
        }
    };

    info!(
        service = "server",
        event = "start",
        %service_id,
        pid,
        version,
        threads = cfg.server.worker_threads.unwrap_or_default(),
        jobs = cfg.jobs.enabled,
        "server service starting"
    );

    rt.block_on(async move {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut server_task = tokio::spawn(server::run(cfg, shutdown_rx));

        tokio::select! {
            res = &mut server_task => return exit_code(res),
            _ = tokio::signal::ctrl_c() => {
                info!(service = "server", event = "shutdown_signal", %service_id, pid, "received Ctrl+C, shutting down");
                let _ = shutdown_tx.send(true);
            }
        }
        exit_code(server_task.await)
    })
}

fn exit_code(res: Result<anyhow::Result<()>, tokio::task::JoinError>) -> std::process::ExitCode {
    match res {
        Ok(Ok(())) => {
            info!(service = "server", event = "stop", "server stopped normally");
            std::process::ExitCode::SUCCESS
        }
        Ok(Err(e)) => {
            error!(service = "server", event = "run_failed", error = %e, "server::run returned error");
            std::process::ExitCode::FAILURE
        }
        Err(e) => {
            error!(service = "server", event = "task_join_error", error = %e, "server task join error");
            std::process::ExitCode::FAILURE
        }
    }
}
