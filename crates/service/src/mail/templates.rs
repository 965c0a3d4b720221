//! Email bodies for the background jobs. Each `render` returns an
//! `EmailMessage` with both HTML and plain-text parts.

use std::fmt::Write as _;

use chrono::NaiveDate;
use serde::Serialize;

use super::EmailMessage;

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// One pending request as listed in a reminder.
#[derive(Debug, Clone)]
pub struct ReminderLine {
    pub request_id: i32,
    pub service_name: String,
    pub customer_name: String,
    pub address: String,
    pub preferred_date: NaiveDate,
}

pub struct DailyReminder<'a> {
    pub to: &'a str,
    pub professional_name: &'a str,
    pub lines: &'a [ReminderLine],
}

impl DailyReminder<'_> {
    pub const SUBJECT: &'static str = "You have pending service requests";

    pub fn render(&self) -> EmailMessage {
        let mut html = format!(
            "<p>Hello {},</p>\n<p>You have {} pending service request(s):</p>\n<ul>\n",
            escape(self.professional_name),
            self.lines.len()
        );
        let mut text = format!(
            "Hello {},\n\nYou have {} pending service request(s):\n",
            self.professional_name,
            self.lines.len()
        );
        for l in self.lines {
            let _ = writeln!(
                html,
                "<li>#{} {} for {} at {} on {}</li>",
                l.request_id,
                escape(&l.service_name),
                escape(&l.customer_name),
                escape(&l.address),
                l.preferred_date
            );
            let _ = writeln!(
                text,
                "- #{} {} for {} at {} on {}",
                l.request_id, l.service_name, l.customer_name, l.address, l.preferred_date
            );
        }
        html.push_str("</ul>\n<p>Please log in to accept or reject them.</p>");
        text.push_str("\nPlease log in to accept or reject them.");
        EmailMessage { to: self.to.to_string(), subject: Self::SUBJECT.to_string(), html, text }
    }
}

/// Per-customer figures for one calendar month.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthlyStats {
    pub total_requests: usize,
    pub completed_requests: usize,
    pub pending_requests: usize,
    pub cancelled_requests: usize,
    pub total_spent: f64,
}

pub struct MonthlyReport<'a> {
    pub to: &'a str,
    pub customer_name: &'a str,
    /// e.g. `"May 2024"`
    pub month: &'a str,
    pub stats: &'a MonthlyStats,
}

impl MonthlyReport<'_> {
    pub fn subject(month: &str) -> String {
        format!("Your Monthly Activity Report - {}", month)
    }

    pub fn render(&self) -> EmailMessage {
        let s = self.stats;
        let html = format!(
            "<p>Hello {name},</p>\n<p>Here is your activity for {month}:</p>\n<table>\n\
             <tr><td>Total requests</td><td>{}</td></tr>\n\
             <tr><td>Completed</td><td>{}</td></tr>\n\
             <tr><td>Pending</td><td>{}</td></tr>\n\
             <tr><td>Cancelled</td><td>{}</td></tr>\n\
             <tr><td>Total spent</td><td>{:.2}</td></tr>\n</table>",
            s.total_requests,
            s.completed_requests,
            s.pending_requests,
            s.cancelled_requests,
            s.total_spent,
            name = escape(self.customer_name),
            month = escape(self.month),
        );
        let text = format!(
            "Hello {},\n\nYour activity for {}:\n  Total requests: {}\n  Completed: {}\n  Pending: {}\n  Cancelled: {}\n  Total spent: {:.2}\n",
            self.customer_name,
            self.month,
            s.total_requests,
            s.completed_requests,
            s.pending_requests,
            s.cancelled_requests,
            s.total_spent,
        );
        EmailMessage { to: self.to.to_string(), subject: Self::subject(self.month), html, text }
    }
}

pub struct TestEmail<'a> {
    pub to: &'a str,
}

impl TestEmail<'_> {
    pub fn render(&self) -> EmailMessage {
        EmailMessage {
            to: self.to.to_string(),
            subject: "Test Email from Fixrify".to_string(),
            html: "<h1>Test Email</h1><p>This is a test email from Fixrify.</p>".to_string(),
            text: "Test Email\n\nThis is a test email from Fixrify.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reminder_lists_every_request_and_escapes_html() {
        let lines = vec![
            ReminderLine {
                request_id: 3,
                service_name: "Plumbing".into(),
                customer_name: "<b>Eve</b>".into(),
                address: "1 Main".into(),
                preferred_date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            },
            ReminderLine {
                request_id: 4,
                service_name: "Painting".into(),
                customer_name: "Sam".into(),
                address: "2 Main".into(),
                preferred_date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            },
        ];
        let msg = DailyReminder { to: "p@x.com", professional_name: "Pat", lines: &lines }.render();
        assert_eq!(msg.subject, "You have pending service requests");
        assert!(msg.html.contains("&lt;b&gt;Eve&lt;/b&gt;"));
        assert!(msg.text.contains("#4 Painting for Sam at 2 Main on 2024-03-05"));
    }

    #[test]
    fn monthly_report_subject_and_total() {
        let stats = MonthlyStats { total_requests: 3, completed_requests: 2, total_spent: 125.5, ..Default::default() };
        let msg = MonthlyReport { to: "c@x.com", customer_name: "Cat", month: "May 2024", stats: &stats }.render();
        assert_eq!(msg.subject, "Your Monthly Activity Report - May 2024");
        assert!(msg.text.contains("Total spent: 125.50"));
    }
}
