mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{count_rows, setup, SecurityGroup};
use hcm_core::Kit;
use hcm_data::{BasePage, DataError, ListOption, Statement};
use hcm_data_sqlx::{Dao, ListPolicy, Orm};
use hcm_filter::Expression;

fn insert_stmt(orm: &Orm, id: &str) -> Statement {
    orm.query("security_group")
        .build_insert(
            &["id", "vendor", "name"],
            vec![vec![id.into(), "aws".into(), "sg".into()]],
        )
        .unwrap()
}

#[tokio::test]
async fn commit_on_success() {
    let (_dir, orm) = setup().await;
    let dao = Dao::<SecurityGroup>::new(orm.clone());
    let kt = Kit::new();

    let (ids, seen) = orm
        .auto_txn(&kt, |tx, _opt| {
            let dao = dao.clone();
            let kt = Kit::new();
            Box::pin(async move {
                let mut rows = vec![SecurityGroup::new("aws", "a"), SecurityGroup::new("gcp", "b")];
                let ids = dao.batch_create_with_tx(&kt, tx, &mut rows).await?;
                let opt = ListOption::new(Expression::all(), BasePage::count_page());
                let seen = dao
                    .list_with_tx(&kt, tx, &opt, &ListPolicy::of::<SecurityGroup>())
                    .await?
                    .count;
                Ok((ids, seen))
            })
        })
        .await
        .unwrap();

    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);
    assert_eq!(seen, 2);
    assert_eq!(count_rows(&orm, "security_group").await, 2);
}

#[tokio::test]
async fn rollback_on_error() {
    let (_dir, orm) = setup().await;
    let kt = Kit::new();

    let result: Result<(), DataError> = orm
        .auto_txn(&kt, |tx, _opt| {
            let orm = orm.clone();
            Box::pin(async move {
                orm.execute(&Kit::new(), tx.as_mut(), "create", insert_stmt(&orm, "1"))
                    .await?;
                Err(DataError::invalid("second step failed"))
            })
        })
        .await;

    assert!(matches!(result, Err(DataError::InvalidParameter(_))));
    assert_eq!(count_rows(&orm, "security_group").await, 0);
}

#[tokio::test]
async fn rollback_then_resume_panic() {
    let (_dir, orm) = setup().await;

    let task_orm = orm.clone();
    let joined = tokio::spawn(async move {
        task_orm
            .auto_txn::<(), _>(&Kit::new(), |tx, _opt| {
                let orm = task_orm.clone();
                Box::pin(async move {
                    orm.execute(&Kit::new(), tx.as_mut(), "create", insert_stmt(&orm, "1"))
                        .await?;
                    panic!("callback exploded");
                })
            })
            .await
    })
    .await;

    assert!(joined.unwrap_err().is_panic());
    assert_eq!(count_rows(&orm, "security_group").await, 0);
}

#[tokio::test]
async fn retry_starts_over_on_request() {
    let (_dir, orm) = setup().await;
    let calls = Arc::new(AtomicU32::new(0));

    let counter = calls.clone();
    let attempt = orm
        .auto_txn(&Kit::new(), |tx, opt| {
            let orm = orm.clone();
            let counter = counter.clone();
            let opt = *opt;
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                // same primary key every attempt: a leaked first attempt would conflict
                orm.execute(&Kit::new(), tx.as_mut(), "create", insert_stmt(&orm, "1"))
                    .await?;
                if !opt.is_retry() {
                    return Err(DataError::RetryTransaction);
                }
                Ok(opt.attempt)
            })
        })
        .await
        .unwrap();

    assert_eq!(attempt, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(count_rows(&orm, "security_group").await, 1);
}

#[tokio::test]
async fn retry_gives_up_after_max_attempts() {
    let (_dir, orm) = setup().await;
    let orm = orm.with_max_retry(1);
    let calls = Arc::new(AtomicU32::new(0));

    let counter = calls.clone();
    let result: Result<(), DataError> = orm
        .auto_txn(&Kit::new(), |_tx, _opt| {
            let counter = counter.clone();
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(DataError::RetryTransaction)
            })
        })
        .await;

    assert!(matches!(result, Err(DataError::Transaction(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn driver_errors_are_not_retried() {
    let (_dir, orm) = setup().await;
    let calls = Arc::new(AtomicU32::new(0));

    let counter = calls.clone();
    let result: Result<u64, DataError> = orm
        .auto_txn(&Kit::new(), |tx, _opt| {
            let orm = orm.clone();
            let counter = counter.clone();
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                let stmt = Statement::new("security_group", "INSERT INTO missing_table VALUES (1)", vec![]);
                orm.execute(&Kit::new(), tx.as_mut(), "create", stmt).await
            })
        })
        .await;

    assert!(matches!(result, Err(DataError::Database { .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancelled_kit_never_begins() {
    let (_dir, orm) = setup().await;
    let kt = Kit::new();
    kt.cancel();

    let result: Result<(), DataError> = orm
        .auto_txn(&kt, |_tx, _opt| Box::pin(async { Ok(()) }))
        .await;
    assert!(matches!(result, Err(DataError::Canceled)));
}

#[tokio::test]
async fn deadline_rolls_back_a_slow_callback() {
    let (_dir, orm) = setup().await;
    let kt = Kit::new().with_timeout(Duration::from_millis(100));

    let result: Result<(), DataError> = orm
        .auto_txn(&kt, |tx, _opt| {
            let orm = orm.clone();
            Box::pin(async move {
                orm.execute(&Kit::new(), tx.as_mut(), "create", insert_stmt(&orm, "1"))
                    .await?;
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
        })
        .await;

    assert!(matches!(result, Err(DataError::Timeout)));
    assert_eq!(count_rows(&orm, "security_group").await, 0);
}
