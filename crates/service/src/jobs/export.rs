//! CSV export of every service request, generated in the background.
//!
//! One TTL cache keyed by task id holds each task's state, including the
//! finished file, so entries for running, ready and failed tasks all expire.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder};
use tracing::{error, info, warn};

use models::service_request;

use crate::errors::ServiceError;
use crate::views::{request_details, RequestDetail};

pub const CSV_HEADER: [&str; 8] =
    ["ID", "Customer", "Service", "Professional", "Status", "Address", "Preferred Date", "Created At"];
pub const FILE_NAME: &str = "service_requests.csv";

/// What a client polling an export sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportStatus {
    Running,
    Ready(Arc<String>),
    Failed(String),
}

#[derive(Clone)]
pub struct ExportStore {
    tasks: Cache<String, ExportStatus>,
}

impl ExportStore {
    pub fn new(ttl: Duration) -> Self {
        Self { tasks: Cache::builder().time_to_live(ttl).build() }
    }

    /// Kick off generation and return the task id to poll.
    pub async fn start(&self, db: DatabaseConnection) -> String {
        let task_id = uuid::Uuid::new_v4().to_string();
        self.tasks.insert(task_id.clone(), ExportStatus::Running).await;
        let store = self.clone();
        let id = task_id.clone();
        tokio::spawn(async move {
            let worker = {
                let store = store.clone();
                let id = id.clone();
                tokio::spawn(async move { store.generate(&db, &id).await })
            };
            if let Err(e) = worker.await {
                error!(task_id = %id, error = %e, event = "export_aborted", "csv export task aborted");
                store.tasks.insert(id, ExportStatus::Failed("export task aborted".into())).await;
            }
        });
        task_id
    }

    /// Run one export to completion under `task_id`.
    pub async fn generate(&self, db: &DatabaseConnection, task_id: &str) {
        self.tasks.insert(task_id.to_string(), ExportStatus::Running).await;
        match export_csv(db).await {
            Ok(csv) => {
                let bytes = csv.len();
                self.tasks.insert(task_id.to_string(), ExportStatus::Ready(Arc::new(csv))).await;
                common::metrics::record_export();
                info!(task_id, bytes, event = "export_ready", "csv export ready");
            }
            Err(e) => {
                warn!(task_id, error = %e, event = "export_failed", "csv export failed");
                self.tasks.insert(task_id.to_string(), ExportStatus::Failed(e.message())).await;
            }
        }
    }

    /// `None` for unknown task ids and for tasks whose entry expired.
    pub async fn status(&self, task_id: &str) -> Option<ExportStatus> {
        self.tasks.get(task_id).await
    }
}

fn party_name(p: &Option<crate::views::PartyView>) -> Option<&str> {
    p.as_ref().map(|p| p.name.as_str())
}

pub fn write_csv(rows: &[RequestDetail]) -> Result<String, ServiceError> {
    let mut w = csv::Writer::from_writer(Vec::new());
    let csv_err = |e: csv::Error| ServiceError::Internal(format!("csv: {}", e));
    w.write_record(CSV_HEADER).map_err(csv_err)?;
    for r in rows {
        let created_at = r.created_at.format("%Y-%m-%d %H:%M:%S").to_string();
        w.write_record([
            r.id.to_string().as_str(),
            party_name(&r.customer).unwrap_or(""),
            r.service.as_ref().map(|s| s.name.as_str()).unwrap_or(""),
            party_name(&r.professional).unwrap_or("Not Assigned"),
            r.status.as_str(),
            r.address.as_str(),
            r.preferred_date.format("%Y-%m-%d").to_string().as_str(),
            created_at.as_str(),
        ])
        .map_err(csv_err)?;
    }
    let bytes = w.into_inner().map_err(|e| ServiceError::Internal(format!("csv: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| ServiceError::Internal(format!("csv: {}", e)))
}

pub async fn export_csv(db: &DatabaseConnection) -> Result<String, ServiceError> {
    let rows = service_request::Entity::find()
        .order_by_asc(service_request::Column::Id)
        .all(db)
        .await?;
    let details = request_details(db, rows).await?;
    write_csv(&details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get_db, make_approved_professional, make_request, make_service, make_user};
    use models::user::Role;

    #[tokio::test]
    async fn csv_lists_requests_with_not_assigned() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let c = make_user(&db, "carol@x.com", Role::Customer, &[]).await;
        let p = make_approved_professional(&db, "pat@x.com", &["Plumbing"]).await;
        let s = make_service(&db, "Plumbing", "Repair", 50.0).await;
        let a = make_request(&db, c.id, s.id, Some(p.id)).await;
        let b = make_request(&db, c.id, s.id, None).await;

        let csv = export_csv(&db).await?;
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "ID,Customer,Service,Professional,Status,Address,Preferred Date,Created At");
        assert!(lines[1].starts_with(&format!("{},carol,Plumbing,pat,pending,12 Elm Street,2024-07-01,", a.id)));
        assert!(lines[2].starts_with(&format!("{},carol,Plumbing,Not Assigned,pending,", b.id)));
        assert_eq!(lines.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn store_tracks_tasks_and_expires_files() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let store = ExportStore::new(Duration::from_millis(200));
        assert_eq!(store.status("missing").await, None);

        store.generate(&db, "t1").await;
        match store.status("t1").await {
            Some(ExportStatus::Ready(csv)) => assert!(csv.starts_with("ID,Customer")),
            other => panic!("unexpected status {:?}", other),
        }

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(store.status("t1").await, None);
        Ok(())
    }

    #[tokio::test]
    async fn every_task_entry_expires() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let store = ExportStore::new(Duration::from_secs(2));
        for i in 0..100 {
            store.generate(&db, &format!("t{}", i)).await;
        }
        store.tasks.run_pending_tasks().await;
        assert_eq!(store.tasks.entry_count(), 100, "no file evicted before its ttl");
        store.tasks.insert("stuck".into(), ExportStatus::Failed("boom".into())).await;

        tokio::time::sleep(Duration::from_millis(2500)).await;
        store.tasks.run_pending_tasks().await;
        assert_eq!(store.tasks.entry_count(), 0);
        assert_eq!(store.status("stuck").await, None);
        Ok(())
    }

    #[tokio::test]
    async fn started_export_eventually_ready() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let store = ExportStore::new(Duration::from_secs(60));
        let id = store.start(db).await;
        for _ in 0..50 {
            if let Some(ExportStatus::Ready(_)) = store.status(&id).await {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("export never finished");
    }
}
