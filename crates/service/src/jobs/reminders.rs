use std::collections::{BTreeMap, HashMap};

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use tracing::{debug, instrument};

use models::service_request::{self, RequestStatus};
use models::{catalog, user};

use super::JobSummary;
use crate::errors::ServiceError;
use crate::mail::templates::{DailyReminder, ReminderLine};
use crate::mail::EmailSender;

/// Email every professional who has pending requests assigned to them.
#[instrument(skip_all)]
pub async fn send_daily_reminders(db: &DatabaseConnection, mailer: &dyn EmailSender) -> Result<JobSummary, ServiceError> {
    let pending = service_request::Entity::find()
        .filter(service_request::Column::Status.eq(RequestStatus::Pending))
        .filter(service_request::Column::ProfessionalId.is_not_null())
        .order_by_asc(service_request::Column::PreferredDate)
        .order_by_asc(service_request::Column::Id)
        .all(db)
        .await?;

    let mut by_professional: BTreeMap<i32, Vec<service_request::Model>> = BTreeMap::new();
    for r in pending {
        if let Some(pro) = r.professional_id {
            by_professional.entry(pro).or_default().push(r);
        }
    }
    if by_professional.is_empty() {
        debug!("no pending assigned requests");
        return Ok(JobSummary::default());
    }

    let users: HashMap<i32, user::Model> = user::Entity::find().all(db).await?.into_iter().map(|u| (u.id, u)).collect();
    let services: HashMap<i32, String> =
        catalog::Entity::find().all(db).await?.into_iter().map(|s| (s.id, s.name)).collect();

    let mut summary = JobSummary::default();
    for (pro_id, requests) in by_professional {
        let Some(pro) = users.get(&pro_id).filter(|p| p.is_active) else {
            continue;
        };
        let lines: Vec<ReminderLine> = requests
            .iter()
            .map(|r| ReminderLine {
                request_id: r.id,
                service_name: services.get(&r.service_id).cloned().unwrap_or_default(),
                customer_name: users.get(&r.customer_id).map(|c| c.name.clone()).unwrap_or_default(),
                address: r.address.clone(),
                preferred_date: r.preferred_date,
            })
            .collect();
        let msg = DailyReminder { to: &pro.email, professional_name: &pro.name, lines: &lines }.render();
        summary.deliver(mailer, msg).await;
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::FakeEmailSender;
    use crate::test_support::{get_db, make_approved_professional, make_request, make_service, make_user, set_status};
    use models::user::Role;

    #[tokio::test]
    async fn one_email_per_professional_with_pending_work() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let c = make_user(&db, "c@x.com", Role::Customer, &[]).await;
        let p1 = make_approved_professional(&db, "p1@x.com", &["Plumbing"]).await;
        let p2 = make_approved_professional(&db, "p2@x.com", &["Plumbing"]).await;
        make_approved_professional(&db, "idle@x.com", &["Plumbing"]).await;
        let s = make_service(&db, "Plumbing", "Repair", 50.0).await;
        make_request(&db, c.id, s.id, Some(p1.id)).await;
        make_request(&db, c.id, s.id, Some(p1.id)).await;
        set_status(&db, make_request(&db, c.id, s.id, Some(p2.id)).await, RequestStatus::Accepted).await;
        make_request(&db, c.id, s.id, None).await;

        let fake = FakeEmailSender::new();
        let summary = send_daily_reminders(&db, &fake).await?;
        assert_eq!(summary, JobSummary { sent: 1, failed: 0 });
        let msg = fake.last_message().unwrap();
        assert_eq!(msg.to, "p1@x.com");
        assert_eq!(msg.subject, DailyReminder::SUBJECT);
        assert!(msg.text.contains("2 pending service request(s)"));
        Ok(())
    }

    #[tokio::test]
    async fn a_failing_recipient_does_not_stop_the_run() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let c = make_user(&db, "c@x.com", Role::Customer, &[]).await;
        let p1 = make_approved_professional(&db, "p1@x.com", &["Plumbing"]).await;
        let p2 = make_approved_professional(&db, "p2@x.com", &["Plumbing"]).await;
        let s = make_service(&db, "Plumbing", "Repair", 50.0).await;
        make_request(&db, c.id, s.id, Some(p1.id)).await;
        make_request(&db, c.id, s.id, Some(p2.id)).await;

        let fake = FakeEmailSender::failing_for(&["p1@x.com"]);
        let summary = send_daily_reminders(&db, &fake).await?;
        assert_eq!(summary, JobSummary { sent: 1, failed: 1 });
        assert_eq!(fake.sent_messages()[0].to, "p2@x.com");
        Ok(())
    }
}
