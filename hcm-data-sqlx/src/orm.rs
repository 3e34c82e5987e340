//! The statement executor every DAO goes through.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hcm_core::Kit;
use hcm_data::{DataError, QueryBuilder, Statement};
use hcm_filter::Dialect;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{Any, AnyPool, Executor, FromRow};
use tracing::{debug, warn};

use crate::bind::to_arguments;
use crate::config::DatabaseConfig;
use crate::error::SqlxErrorExt;
use crate::id::{IdGenerator, UuidGenerator};
use crate::limiter::IngressLimiter;

/// Pool, dialect and the policies applied to every statement: the per-table
/// ingress limiter, the slow-query log and the id generator.
///
/// Cloning is cheap; clones share the pool and the limiter buckets.
#[derive(Clone)]
pub struct Orm {
    pool: AnyPool,
    dialect: Dialect,
    limiter: Option<IngressLimiter>,
    slow_request: Duration,
    ids: Arc<dyn IdGenerator>,
    pub(crate) max_retry: u32,
}

impl Orm {
    /// Wrap an existing pool.
    pub fn new(pool: AnyPool, dialect: Dialect) -> Self {
        let defaults = DatabaseConfig::default();
        Self {
            pool,
            dialect,
            limiter: None,
            slow_request: defaults.slow_request,
            ids: Arc::new(UuidGenerator),
            max_retry: defaults.max_retry,
        }
    }

    /// Connect a pool for `config.url` and apply the section's policies.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DataError> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|e| e.into_data_error("connect database"))?;

        let mut orm = Self::new(pool, Dialect::from_url(&config.url))
            .with_slow_request(config.slow_request)
            .with_max_retry(config.max_retry);
        if config.ingress_qps > 0 {
            orm = orm.with_ingress_limiter(IngressLimiter::new(
                config.ingress_qps,
                config.ingress_burst,
            ));
        }
        Ok(orm)
    }

    pub fn with_ingress_limiter(mut self, limiter: IngressLimiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn with_slow_request(mut self, threshold: Duration) -> Self {
        self.slow_request = threshold;
        self
    }

    pub fn with_id_generator(mut self, ids: impl IdGenerator) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    /// Extra attempts granted to a unit of work returning [`DataError::RetryTransaction`].
    pub fn with_max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = max_retry;
        self
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// A statement builder for `table` in this pool's dialect.
    pub fn query(&self, table: &str) -> QueryBuilder {
        QueryBuilder::new_with_dialect(table, self.dialect)
    }

    pub fn gen_ids(&self, table: &str, count: usize) -> Vec<String> {
        self.ids.generate(table, count)
    }

    /// Run a SELECT and decode every row.
    ///
    /// `exec` is the pool or a transaction's connection (`tx.as_mut()`).
    pub async fn select<'c, T, E>(
        &self,
        kt: &Kit,
        exec: E,
        op: &str,
        mut stmt: Statement,
    ) -> Result<Vec<T>, DataError>
    where
        T: for<'r> FromRow<'r, AnyRow> + Send + Unpin,
        E: Executor<'c, Database = Any>,
    {
        self.admit(&stmt)?;
        let args = to_arguments(std::mem::take(&mut stmt.args))?;
        let start = Instant::now();
        let result = guarded(kt, async {
            sqlx::query_as_with::<Any, T, _>(&stmt.sql, args)
                .fetch_all(exec)
                .await
                .map_err(|e| e.into_data_error(format!("{op} {}", stmt.table)))
        })
        .await;
        self.log_cost(kt, &stmt, start);
        result
    }

    /// Run a `SELECT COUNT(*)`.
    pub async fn count<'c, E>(
        &self,
        kt: &Kit,
        exec: E,
        op: &str,
        mut stmt: Statement,
    ) -> Result<u64, DataError>
    where
        E: Executor<'c, Database = Any>,
    {
        self.admit(&stmt)?;
        let args = to_arguments(std::mem::take(&mut stmt.args))?;
        let start = Instant::now();
        let result = guarded(kt, async {
            sqlx::query_scalar_with::<Any, i64, _>(&stmt.sql, args)
                .fetch_one(exec)
                .await
                .map_err(|e| e.into_data_error(format!("{op} {}", stmt.table)))
        })
        .await;
        self.log_cost(kt, &stmt, start);
        Ok(u64::try_from(result?).unwrap_or_default())
    }

    /// Run an INSERT, UPDATE or DELETE, returning the affected row count.
    pub async fn execute<'c, E>(
        &self,
        kt: &Kit,
        exec: E,
        op: &str,
        mut stmt: Statement,
    ) -> Result<u64, DataError>
    where
        E: Executor<'c, Database = Any>,
    {
        self.admit(&stmt)?;
        let args = to_arguments(std::mem::take(&mut stmt.args))?;
        let start = Instant::now();
        let result = guarded(kt, async {
            sqlx::query_with::<Any, _>(&stmt.sql, args)
                .execute(exec)
                .await
                .map(|done| done.rows_affected())
                .map_err(|e| e.into_data_error(format!("{op} {}", stmt.table)))
        })
        .await;
        self.log_cost(kt, &stmt, start);
        result
    }

    fn admit(&self, stmt: &Statement) -> Result<(), DataError> {
        match &self.limiter {
            Some(limiter) if !limiter.try_acquire(&stmt.table) => Err(DataError::TooManyRequests(
                format!("{} ingress limit exceeded", stmt.table),
            )),
            _ => Ok(()),
        }
    }

    fn log_cost(&self, kt: &Kit, stmt: &Statement, start: Instant) {
        let cost = start.elapsed();
        if cost > self.slow_request {
            warn!(
                rid = %kt.rid,
                table = %stmt.table,
                sql = %stmt.sql,
                cost_ms = cost.as_millis() as u64,
                "slow sql"
            );
        } else {
            debug!(rid = %kt.rid, sql = %stmt.sql, cost_ms = cost.as_millis() as u64, "sql");
        }
    }
}

impl std::fmt::Debug for Orm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orm")
            .field("dialect", &self.dialect)
            .field("limiter", &self.limiter)
            .field("slow_request", &self.slow_request)
            .field("max_retry", &self.max_retry)
            .finish_non_exhaustive()
    }
}

/// Race `fut` against the kit's cancellation token and deadline.
pub(crate) async fn guarded<F, T>(kt: &Kit, fut: F) -> Result<T, DataError>
where
    F: Future<Output = Result<T, DataError>>,
{
    let token = kt.cancellation_token();
    match kt.deadline() {
        Some(deadline) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(DataError::Canceled),
            _ = tokio::time::sleep_until(deadline) => Err(DataError::Timeout),
            res = fut => res,
        },
        None => tokio::select! {
            biased;
            _ = token.cancelled() => Err(DataError::Canceled),
            res = fut => res,
        },
    }
}
