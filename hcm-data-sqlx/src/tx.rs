//! Transaction wrapper and the `auto_txn` unit of work.
//!
//! [`Orm::auto_txn`] begins a transaction, hands it to a callback and then
//! commits or rolls back depending on how the callback finished:
//!
//! - `Ok` → commit; a commit failure is returned as [`DataError::Transaction`]
//! - `Err` → rollback, the error propagates
//! - panic → rollback, the panic resumes
//! - the kit is cancelled or its deadline passes → rollback, `Canceled` / `Timeout`
//!
//! The value is only handed back after a successful commit.

use std::ops::{Deref, DerefMut};
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use hcm_core::Kit;
use hcm_data::DataError;
use rand::Rng;
use sqlx::{Any, AnyConnection, Transaction};
use tracing::{error, warn};

use crate::orm::{guarded, Orm};

const RETRY_BACKOFF_MIN_MS: u64 = 50;
const RETRY_BACKOFF_MAX_MS: u64 = 500;

/// A wrapper around an SQLx [`Transaction`] on the `Any` driver.
///
/// Statements run inside the unit of work through [`Tx::as_mut`]:
///
/// ```ignore
/// orm.auto_txn(&kt, |tx, _opt| {
///     let orm = orm.clone();
///     let kt = kt.clone();
///     Box::pin(async move {
///         let stmt = orm.query("region").build_delete(&Expression::in_ids(["1"]))?;
///         orm.execute(&kt, tx.as_mut(), "delete", stmt).await
///     })
/// })
/// .await?;
/// ```
pub struct Tx(pub Transaction<'static, Any>);

impl Deref for Tx {
    type Target = Transaction<'static, Any>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Tx {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Tx {
    /// Unwraps the `Tx` into the inner `Transaction`.
    pub fn into_inner(self) -> Transaction<'static, Any> {
        self.0
    }

    /// Returns a mutable reference to the underlying connection.
    pub fn as_mut(&mut self) -> &mut AnyConnection {
        &mut *self.0
    }
}

/// What a unit-of-work callback knows about the attempt it runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxnOption {
    /// 0 for the first attempt.
    pub attempt: u32,
    /// Retries still available after this attempt.
    pub retries_left: u32,
}

impl TxnOption {
    pub fn is_retry(&self) -> bool {
        self.attempt > 0
    }
}

impl Orm {
    /// Run `run` in one transaction.
    ///
    /// Driver errors are never retried implicitly. A callback that detects a
    /// conflict it can resolve by starting over returns
    /// [`DataError::RetryTransaction`]; the attempt is rolled back and `run`
    /// is called again, up to the configured retry count, after a random
    /// 50 to 500 ms back-off.
    pub async fn auto_txn<T, F>(&self, kt: &Kit, mut run: F) -> Result<T, DataError>
    where
        T: Send,
        F: for<'t> FnMut(&'t mut Tx, &'t TxnOption) -> BoxFuture<'t, Result<T, DataError>> + Send,
    {
        let mut attempt = 0u32;
        loop {
            let opt = TxnOption {
                attempt,
                retries_left: self.max_retry.saturating_sub(attempt),
            };
            match self.txn_attempt(kt, &mut run, &opt).await {
                Err(DataError::RetryTransaction) if attempt < self.max_retry => {
                    attempt += 1;
                    let backoff = rand::thread_rng().gen_range(RETRY_BACKOFF_MIN_MS..=RETRY_BACKOFF_MAX_MS);
                    warn!(rid = %kt.rid, attempt, backoff_ms = backoff, "retry transaction");
                    guarded(kt, async {
                        tokio::time::sleep(Duration::from_millis(backoff)).await;
                        Ok(())
                    })
                    .await?;
                }
                Err(DataError::RetryTransaction) => {
                    error!(rid = %kt.rid, attempts = attempt + 1, "transaction retry exhausted");
                    return Err(DataError::Transaction(format!(
                        "gave up after {} attempts",
                        attempt + 1
                    )));
                }
                other => return other,
            }
        }
    }

    async fn txn_attempt<T, F>(&self, kt: &Kit, run: &mut F, opt: &TxnOption) -> Result<T, DataError>
    where
        F: for<'t> FnMut(&'t mut Tx, &'t TxnOption) -> BoxFuture<'t, Result<T, DataError>>,
    {
        let tx = guarded(kt, async {
            self.pool()
                .begin()
                .await
                .map_err(|e| DataError::Transaction(format!("begin failed, err: {e}")))
        })
        .await?;
        let mut tx = Tx(tx);

        let outcome = {
            let fut = AssertUnwindSafe(run(&mut tx, opt)).catch_unwind();
            guarded(kt, async move { Ok(fut.await) }).await
        };

        match outcome {
            Ok(Ok(Ok(value))) => {
                tx.into_inner()
                    .commit()
                    .await
                    .map_err(|e| DataError::Transaction(format!("commit failed, err: {e}")))?;
                Ok(value)
            }
            Ok(Ok(Err(err))) => {
                rollback(kt, tx).await;
                Err(err)
            }
            Ok(Err(panic)) => {
                rollback(kt, tx).await;
                std::panic::resume_unwind(panic)
            }
            Err(interrupted) => {
                warn!(rid = %kt.rid, err = %interrupted, "transaction interrupted, rolling back");
                rollback(kt, tx).await;
                Err(interrupted)
            }
        }
    }
}

/// Roll back and log a failure; the caller's error is what gets returned.
async fn rollback(kt: &Kit, tx: Tx) {
    if let Err(e) = tx.into_inner().rollback().await {
        error!(rid = %kt.rid, err = %e, "rollback transaction failed");
    }
}
