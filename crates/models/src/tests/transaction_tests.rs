use anyhow::Result;
use sea_orm::{EntityTrait, TransactionTrait};

use super::setup_test_db;
use crate::user::{self, NewUser};

/// Test basic transaction commit
#[tokio::test]
async fn test_transaction_commit() -> Result<()> {
    let db = setup_test_db().await?;

    let txn = db.begin().await?;
    let created = user::create(&txn, NewUser { name: "Tx".into(), email: "tx@example.com".into(), ..Default::default() }).await?;
    txn.commit().await?;

    let found = user::Entity::find_by_id(created.id).one(&db).await?;
    assert!(found.is_some());
    Ok(())
}

/// Test transaction rollback leaves no rows behind
#[tokio::test]
async fn test_transaction_rollback() -> Result<()> {
    let db = setup_test_db().await?;

    let txn = db.begin().await?;
    let created = user::create(&txn, NewUser { name: "Rb".into(), email: "rb@example.com".into(), ..Default::default() }).await?;
    txn.rollback().await?;

    let found = user::Entity::find_by_id(created.id).one(&db).await?;
    assert!(found.is_none());
    Ok(())
}
