use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use tracing::instrument;

use models::service_request::{self, RequestStatus};
use models::user::{self, Role};
use models::catalog;

use super::JobSummary;
use crate::errors::ServiceError;
use crate::mail::templates::{MonthlyReport, MonthlyStats};
use crate::mail::EmailSender;

/// `[first day of previous month, first day of this month)` relative to `now`.
pub fn previous_month(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let this_month = NaiveDate::from_ymd_opt(now.year(), now.month(), 1).unwrap_or(now.date_naive());
    let prev_month = if now.month() == 1 {
        NaiveDate::from_ymd_opt(now.year() - 1, 12, 1)
    } else {
        NaiveDate::from_ymd_opt(now.year(), now.month() - 1, 1)
    }
    .unwrap_or(this_month);
    let at_midnight = |d: NaiveDate| Utc.from_utc_datetime(&d.and_time(chrono::NaiveTime::MIN));
    (at_midnight(prev_month), at_midnight(this_month))
}

/// Fold one customer's requests for the month into report figures.
pub fn monthly_stats(requests: &[&service_request::Model], base_prices: &HashMap<i32, f64>) -> MonthlyStats {
    let mut stats = MonthlyStats { total_requests: requests.len(), ..Default::default() };
    for r in requests {
        match r.status {
            RequestStatus::Completed => {
                stats.completed_requests += 1;
                stats.total_spent +=
                    r.final_price.or_else(|| base_prices.get(&r.service_id).copied()).unwrap_or(0.0);
            }
            RequestStatus::Pending => stats.pending_requests += 1,
            RequestStatus::Cancelled => stats.cancelled_requests += 1,
            RequestStatus::Accepted | RequestStatus::Rejected => {}
        }
    }
    stats
}

pub async fn send_monthly_reports(db: &DatabaseConnection, mailer: &dyn EmailSender) -> Result<JobSummary, ServiceError> {
    send_monthly_reports_at(db, mailer, Utc::now()).await
}

/// Email each active customer their activity for the month before `now`.
#[instrument(skip(db, mailer))]
pub async fn send_monthly_reports_at(
    db: &DatabaseConnection,
    mailer: &dyn EmailSender,
    now: DateTime<Utc>,
) -> Result<JobSummary, ServiceError> {
    let (start, end) = previous_month(now);
    let month = start.format("%B %Y").to_string();

    let customers = user::Entity::find()
        .filter(user::Column::Role.eq(Role::Customer))
        .filter(user::Column::IsActive.eq(true))
        .order_by_asc(user::Column::Id)
        .all(db)
        .await?;
    let base_prices: HashMap<i32, f64> =
        catalog::Entity::find().all(db).await?.into_iter().map(|s| (s.id, s.base_price)).collect();

    let requests = service_request::Entity::find().all(db).await?;
    let mut by_customer: BTreeMap<i32, Vec<&service_request::Model>> = BTreeMap::new();
    for r in &requests {
        let created = r.created_at.with_timezone(&Utc);
        if created >= start && created < end {
            by_customer.entry(r.customer_id).or_default().push(r);
        }
    }

    let mut summary = JobSummary::default();
    for customer in &customers {
        let mine = by_customer.get(&customer.id).map(Vec::as_slice).unwrap_or_default();
        let stats = monthly_stats(mine, &base_prices);
        let msg = MonthlyReport { to: &customer.email, customer_name: &customer.name, month: &month, stats: &stats }.render();
        summary.deliver(mailer, msg).await;
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::FakeEmailSender;
    use crate::test_support::{get_db, make_request, make_service, make_user, set_status};
    use sea_orm::{ActiveModelTrait, Set};

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn previous_month_wraps_the_year() {
        let (start, end) = previous_month(at(2024, 1, 20));
        assert_eq!(start, Utc.with_ymd_and_hms(2023, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(start.format("%B %Y").to_string(), "December 2023");
    }

    async fn backdate(db: &DatabaseConnection, r: service_request::Model, when: DateTime<Utc>) -> service_request::Model {
        let mut am: service_request::ActiveModel = r.into();
        am.created_at = Set(when.into());
        am.update(db).await.unwrap()
    }

    #[tokio::test]
    async fn report_counts_only_last_month() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let c = make_user(&db, "c@x.com", Role::Customer, &[]).await;
        make_user(&db, "quiet@x.com", Role::Customer, &[]).await;
        make_user(&db, "pro@x.com", Role::Professional, &["Plumbing"]).await;
        let s = make_service(&db, "Plumbing", "Repair", 50.0).await;

        let done = set_status(&db, make_request(&db, c.id, s.id, None).await, RequestStatus::Completed).await;
        backdate(&db, done, at(2024, 5, 3)).await;
        let mut priced: service_request::ActiveModel =
            set_status(&db, make_request(&db, c.id, s.id, None).await, RequestStatus::Completed).await.into();
        priced.final_price = Set(Some(80.0));
        backdate(&db, priced.update(&db).await?, at(2024, 5, 31)).await;
        let cancelled = set_status(&db, make_request(&db, c.id, s.id, None).await, RequestStatus::Cancelled).await;
        backdate(&db, cancelled, at(2024, 5, 10)).await;
        backdate(&db, make_request(&db, c.id, s.id, None).await, at(2024, 5, 12)).await;
        backdate(&db, make_request(&db, c.id, s.id, None).await, at(2024, 4, 30)).await;
        backdate(&db, make_request(&db, c.id, s.id, None).await, at(2024, 6, 1)).await;

        let fake = FakeEmailSender::new();
        let summary = send_monthly_reports_at(&db, &fake, at(2024, 6, 15)).await?;
        assert_eq!(summary, JobSummary { sent: 2, failed: 0 });

        let sent = fake.sent_messages();
        let mine = sent.iter().find(|m| m.to == "c@x.com").unwrap();
        assert_eq!(mine.subject, "Your Monthly Activity Report - May 2024");
        assert!(mine.text.contains("Total requests: 4"));
        assert!(mine.text.contains("Completed: 2"));
        assert!(mine.text.contains("Pending: 1"));
        assert!(mine.text.contains("Cancelled: 1"));
        assert!(mine.text.contains("Total spent: 130.00"));

        let quiet = sent.iter().find(|m| m.to == "quiet@x.com").unwrap();
        assert!(quiet.text.contains("Total requests: 0"));
        Ok(())
    }
}
