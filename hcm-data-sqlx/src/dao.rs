use std::marker::PhantomData;

use hcm_core::Kit;
use hcm_data::{
    projection, BatchDeleteByIdReq, BatchDeleteReq, DataError, ListOption, ListResult, PageOption,
    PageSqlOption, Table,
};
use hcm_filter::{ExprOption, Expression, SqlArg, SqlWhereOption};
use sqlx::any::AnyRow;
use sqlx::{Any, Executor, FromRow};
use tracing::error;

use crate::orm::Orm;
use crate::tx::Tx;

/// Call-site policies for a list: filter allow-list, page limits, ordering
/// and the server-side compile options (e.g. crowned tenant rules).
#[derive(Debug, Clone)]
pub struct ListPolicy {
    pub expr_opt: ExprOption,
    pub page_opt: PageOption,
    pub page_sql_opt: PageSqlOption,
    pub where_opt: SqlWhereOption,
}

impl ListPolicy {
    /// Defaults for table `T`: its columns as the allow-list.
    pub fn of<T: Table>() -> Self {
        Self {
            expr_opt: T::expr_option(),
            page_opt: PageOption::default(),
            page_sql_opt: PageSqlOption::default(),
            where_opt: SqlWhereOption::default(),
        }
    }

    pub fn with_page_option(mut self, page_opt: PageOption) -> Self {
        self.page_opt = page_opt;
        self
    }

    pub fn with_page_sql_option(mut self, page_sql_opt: PageSqlOption) -> Self {
        self.page_sql_opt = page_sql_opt;
        self
    }

    pub fn with_where_option(mut self, where_opt: SqlWhereOption) -> Self {
        self.where_opt = where_opt;
        self
    }
}

/// Generic table access for a [`Table`] row type.
///
/// ```ignore
/// let dao = Dao::<SecurityGroup>::new(orm.clone());
/// let result = dao.list(&kt, &req).await?;
/// ```
pub struct Dao<T> {
    orm: Orm,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Dao<T> {
    fn clone(&self) -> Self {
        Self {
            orm: self.orm.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Dao<T>
where
    T: Table,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dao").field("table", &T::table_name()).finish()
    }
}

impl<T> Dao<T>
where
    T: Table + for<'r> FromRow<'r, AnyRow>,
{
    pub fn new(orm: Orm) -> Self {
        Self {
            orm,
            _marker: PhantomData,
        }
    }

    pub fn orm(&self) -> &Orm {
        &self.orm
    }

    /// List with the table's default policy.
    pub async fn list(&self, kt: &Kit, opt: &ListOption) -> Result<ListResult<T>, DataError> {
        self.list_with(kt, opt, &ListPolicy::of::<T>()).await
    }

    /// List with a call-site policy.
    pub async fn list_with(
        &self,
        kt: &Kit,
        opt: &ListOption,
        policy: &ListPolicy,
    ) -> Result<ListResult<T>, DataError> {
        self.list_on(kt, self.orm.pool(), opt, policy)
            .await
            .inspect_err(|err| log_failure(kt, "list", err))
    }

    /// List inside a unit of work, seeing its uncommitted writes.
    pub async fn list_with_tx(
        &self,
        kt: &Kit,
        tx: &mut Tx,
        opt: &ListOption,
        policy: &ListPolicy,
    ) -> Result<ListResult<T>, DataError> {
        self.list_on(kt, tx.as_mut(), opt, policy)
            .await
            .inspect_err(|err| log_failure(kt, "list", err))
    }

    async fn list_on<'c, E>(
        &self,
        kt: &Kit,
        exec: E,
        opt: &ListOption,
        policy: &ListPolicy,
    ) -> Result<ListResult<T>, DataError>
    where
        E: Executor<'c, Database = Any>,
    {
        opt.validate(&policy.expr_opt, Some(&policy.page_opt))?;
        let (filter, page) = opt.parts()?;
        let query = self
            .orm
            .query(T::table_name())
            .where_option(policy.where_opt.clone());

        if page.count {
            let stmt = query.build_count(filter)?;
            let count = self.orm.count(kt, exec, "count", stmt).await?;
            return Ok(ListResult::count(count));
        }

        let columns = projection::<T>(&opt.fields)?;
        let stmt = query.build_select(&columns, filter, page, &policy.page_sql_opt)?;
        let details = self.orm.select(kt, exec, "list", stmt).await?;
        Ok(ListResult::details(details))
    }

    /// Insert `rows` with freshly generated ids, returned in row order.
    pub async fn batch_create_with_tx(
        &self,
        kt: &Kit,
        tx: &mut Tx,
        rows: &mut [T],
    ) -> Result<Vec<String>, DataError> {
        if rows.is_empty() {
            return Err(DataError::invalid(format!(
                "create {}: rows are required",
                T::table_name()
            )));
        }
        for row in rows.iter() {
            row.insert_validate()?;
        }

        let ids = self.orm.gen_ids(T::table_name(), rows.len());
        for (row, id) in rows.iter_mut().zip(&ids) {
            row.set_id(id.clone());
        }

        let values = rows.iter().map(T::values).collect();
        let stmt = self
            .orm
            .query(T::table_name())
            .build_insert(&T::column_names(), values)?;
        self.orm
            .execute(kt, tx.as_mut(), "create", stmt)
            .await
            .inspect_err(|err| log_failure(kt, "create", err))?;
        Ok(ids)
    }

    /// Update the rows matching `filter` in a unit of work of their own.
    /// Matching nothing is [`DataError::NotFound`].
    pub async fn update(&self, kt: &Kit, filter: &Expression, row: &T) -> Result<u64, DataError> {
        row.update_validate()?;
        let sets = row.update_values();
        let dao = self.clone();
        let kit = kt.clone();
        let filter = filter.clone();
        self.orm
            .auto_txn(kt, move |tx, _opt| {
                let dao = dao.clone();
                let kit = kit.clone();
                let filter = filter.clone();
                let sets = sets.clone();
                Box::pin(async move {
                    let affected = dao.update_sets_with_tx(&kit, tx, &filter, sets).await?;
                    if affected == 0 {
                        return Err(DataError::NotFound(format!(
                            "update {} matched no rows",
                            T::table_name()
                        )));
                    }
                    Ok(affected)
                })
            })
            .await
    }

    /// Update the rows matching `filter`, returning how many changed.
    pub async fn update_with_tx(
        &self,
        kt: &Kit,
        tx: &mut Tx,
        filter: &Expression,
        row: &T,
    ) -> Result<u64, DataError> {
        row.update_validate()?;
        self.update_sets_with_tx(kt, tx, filter, row.update_values())
            .await
    }

    /// Update one row by id; a missing row is [`DataError::NotFound`].
    pub async fn update_by_id_with_tx(
        &self,
        kt: &Kit,
        tx: &mut Tx,
        id: &str,
        row: &T,
    ) -> Result<(), DataError> {
        if id.is_empty() {
            return Err(DataError::invalid("id is required"));
        }
        let affected = self
            .update_with_tx(kt, tx, &Expression::equal("id", id), row)
            .await?;
        if affected == 0 {
            return Err(DataError::NotFound(format!("{} id: {id}", T::table_name())));
        }
        Ok(())
    }

    async fn update_sets_with_tx(
        &self,
        kt: &Kit,
        tx: &mut Tx,
        filter: &Expression,
        sets: Vec<(&'static str, SqlArg)>,
    ) -> Result<u64, DataError> {
        let stmt = self.orm.query(T::table_name()).build_update(sets, filter)?;
        self.orm
            .execute(kt, tx.as_mut(), "update", stmt)
            .await
            .inspect_err(|err| log_failure(kt, "update", err))
    }

    /// Delete the rows matching a non-empty `filter`.
    pub async fn delete_with_tx(
        &self,
        kt: &Kit,
        tx: &mut Tx,
        filter: &Expression,
    ) -> Result<u64, DataError> {
        if filter.is_empty() {
            return Err(DataError::invalid(format!(
                "delete {}: filter is required",
                T::table_name()
            )));
        }
        let stmt = self.orm.query(T::table_name()).build_delete(filter)?;
        self.orm
            .execute(kt, tx.as_mut(), "delete", stmt)
            .await
            .inspect_err(|err| log_failure(kt, "delete", err))
    }

    /// Validate and run a delete-by-filter request in its own unit of work.
    pub async fn batch_delete(&self, kt: &Kit, req: &BatchDeleteReq) -> Result<u64, DataError> {
        let filter = req.validate(&T::expr_option())?.clone();
        self.delete_in_txn(kt, filter).await
    }

    /// Validate and run a delete-by-id request in its own unit of work.
    pub async fn batch_delete_by_ids(
        &self,
        kt: &Kit,
        req: &BatchDeleteByIdReq,
    ) -> Result<u64, DataError> {
        req.validate()?;
        self.delete_in_txn(kt, req.to_filter()).await
    }

    async fn delete_in_txn(&self, kt: &Kit, filter: Expression) -> Result<u64, DataError> {
        let dao = self.clone();
        let kit = kt.clone();
        self.orm
            .auto_txn(kt, move |tx, _opt| {
                let dao = dao.clone();
                let kit = kit.clone();
                let filter = filter.clone();
                Box::pin(async move { dao.delete_with_tx(&kit, tx, &filter).await })
            })
            .await
    }
}

fn log_failure(kt: &Kit, op: &str, err: &DataError) {
    if matches!(err, DataError::InvalidParameter(_) | DataError::NotFound(_)) {
        return;
    }
    error!(rid = %kt.rid, op, err = %err, "data operation failed");
}
