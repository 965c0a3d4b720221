//! Process-wide prometheus registry.
//!
//! Counters are registered lazily on first use; `render` produces the text
//! exposition format served at `/metrics`.

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

pub static REGISTRY: Lazy<Registry> = Lazy::new(|| Registry::new_custom(Some("fixrify".into()), None).unwrap_or_default());

pub static JOB_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    let c = IntCounterVec::new(Opts::new("job_runs_total", "Background job runs by job and outcome"), &["job", "outcome"])
        .expect("job_runs_total opts");
    let _ = REGISTRY.register(Box::new(c.clone()));
    c
});

pub static EMAILS: Lazy<IntCounterVec> = Lazy::new(|| {
    let c = IntCounterVec::new(Opts::new("emails_total", "Emails handed to the mail transport by outcome"), &["outcome"])
        .expect("emails_total opts");
    let _ = REGISTRY.register(Box::new(c.clone()));
    c
});

pub static EXPORTS: Lazy<IntCounter> = Lazy::new(|| {
    let c = IntCounter::new("exports_generated_total", "CSV exports generated").expect("exports opts");
    let _ = REGISTRY.register(Box::new(c.clone()));
    c
});

pub fn record_job(job: &str, ok: bool) {
    JOB_RUNS.with_label_values(&[job, if ok { "ok" } else { "error" }]).inc();
}

pub fn record_email(ok: bool) {
    EMAILS.with_label_values(&[if ok { "sent" } else { "failed" }]).inc();
}

pub fn record_export() {
    EXPORTS.inc();
}

/// Render all registered metrics in the prometheus text format.
pub fn render() -> String {
    // touch the lazies so the families show up even before the first event
    Lazy::force(&JOB_RUNS);
    Lazy::force(&EMAILS);
    Lazy::force(&EXPORTS);
    let mut buf = Vec::new();
    let encoder = TextEncoder::new();
    if encoder.encode(&REGISTRY.gather(), &mut buf).is_err() {
        return String::new();
    }
    String::from_utf8(buf).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_contains_recorded_job() {
        record_job("daily_reminders", true);
        let text = render();
        assert!(text.contains("fixrify_job_runs_total"));
        assert!(text.contains("daily_reminders"));
    }
}
