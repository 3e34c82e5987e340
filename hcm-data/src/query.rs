//! A statement builder for the resource tables.
//!
//! Every statement takes its predicate from a filter [`Expression`]; values
//! are bound, identifiers are validated.
//!
//! # Example
//!
//! ```ignore
//! let stmt = QueryBuilder::new("security_group")
//!     .dialect(Dialect::Postgres)
//!     .build_select(&["id", "name"], &filter, &page, &PageSqlOption::default())?;
//! // SELECT id, name FROM security_group WHERE id IN ($1, $2) ORDER BY id ASC LIMIT 10 OFFSET 0
//! ```

use hcm_filter::{is_valid_identifier, Dialect, Expression, SqlArg, SqlWhereOption};

use crate::page::{page_sql_expr, BasePage, PageSqlOption};
use crate::DataError;

/// SQL text plus the values bound to its placeholders, in order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statement {
    /// Table the statement targets; keys the ingress limiter and log context.
    pub table: String,
    pub sql: String,
    pub args: Vec<SqlArg>,
}

impl Statement {
    pub fn new(table: impl Into<String>, sql: impl Into<String>, args: Vec<SqlArg>) -> Self {
        Self {
            table: table.into(),
            sql: sql.into(),
            args,
        }
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.sql)
    }
}

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    table: String,
    where_opt: SqlWhereOption,
}

impl QueryBuilder {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            where_opt: SqlWhereOption::default(),
        }
    }

    /// Create a new builder with an explicit SQL dialect.
    pub fn new_with_dialect(table: &str, dialect: Dialect) -> Self {
        Self::new(table).dialect(dialect)
    }

    /// Set the SQL dialect (affects placeholders and JSON functions).
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.where_opt.dialect = dialect;
        self
    }

    /// Replace the filter compile options, keeping the builder's dialect.
    pub fn where_option(mut self, opt: SqlWhereOption) -> Self {
        let dialect = self.where_opt.dialect;
        self.where_opt = SqlWhereOption { dialect, ..opt };
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn get_dialect(&self) -> Dialect {
        self.where_opt.dialect
    }

    /// `SELECT <columns> FROM <table> [WHERE ...] ORDER BY ... [LIMIT n OFFSET m]`.
    pub fn build_select(
        &self,
        columns: &[&str],
        filter: &Expression,
        page: &BasePage,
        page_opt: &PageSqlOption,
    ) -> Result<Statement, DataError> {
        let table = self.checked_table()?;
        let columns = format_column_list_checked(columns)?;
        let clause = filter.compile(&self.where_opt)?;

        let mut sql = format!("SELECT {columns} FROM {table}");
        append_clause(&mut sql, &clause.where_sql());
        append_clause(&mut sql, &page_sql_expr(page, page_opt)?);
        Ok(Statement::new(table, sql, clause.args))
    }

    /// `SELECT COUNT(*) FROM <table> [WHERE ...]`.
    pub fn build_count(&self, filter: &Expression) -> Result<Statement, DataError> {
        let table = self.checked_table()?;
        let clause = filter.compile(&self.where_opt)?;

        let mut sql = format!("SELECT COUNT(*) FROM {table}");
        append_clause(&mut sql, &clause.where_sql());
        Ok(Statement::new(table, sql, clause.args))
    }

    /// `DELETE FROM <table> WHERE ...`; an empty filter is refused.
    pub fn build_delete(&self, filter: &Expression) -> Result<Statement, DataError> {
        let table = self.checked_table()?;
        let clause = filter.compile(&self.where_opt)?;
        if clause.is_empty() {
            return Err(DataError::invalid(format!(
                "delete {table} requires a filter"
            )));
        }
        Ok(Statement::new(
            table,
            format!("DELETE FROM {table} {}", clause.where_sql()),
            clause.args,
        ))
    }

    /// `UPDATE <table> SET a = ?, b = ? WHERE ...`; SET values bind first.
    pub fn build_update(
        &self,
        sets: Vec<(&str, SqlArg)>,
        filter: &Expression,
    ) -> Result<Statement, DataError> {
        let table = self.checked_table()?;
        if sets.is_empty() {
            return Err(DataError::invalid(format!("update {table} sets no column")));
        }

        let dialect = self.where_opt.dialect;
        let mut assignments = Vec::with_capacity(sets.len());
        let mut args = Vec::with_capacity(sets.len());
        for (idx, (column, value)) in sets.into_iter().enumerate() {
            let column = format_identifier_checked(column, "column")?;
            assignments.push(format!("{column} = {}", dialect.placeholder(idx + 1)));
            args.push(value);
        }

        let clause = filter.compile_from(&self.where_opt, args.len() + 1)?;
        if clause.is_empty() {
            return Err(DataError::invalid(format!(
                "update {table} requires a filter"
            )));
        }
        let sql = format!(
            "UPDATE {table} SET {} {}",
            assignments.join(", "),
            clause.where_sql()
        );
        args.extend(clause.args);
        Ok(Statement::new(table, sql, args))
    }

    /// Multi-row `INSERT INTO <table> (...) VALUES (...), (...)`.
    pub fn build_insert(
        &self,
        columns: &[&str],
        rows: Vec<Vec<SqlArg>>,
    ) -> Result<Statement, DataError> {
        let table = self.checked_table()?;
        if rows.is_empty() {
            return Err(DataError::invalid(format!("insert {table} has no rows")));
        }
        let column_list = format_column_list_checked(columns)?;

        let dialect = self.where_opt.dialect;
        let mut placeholder_idx = 1usize;
        let mut tuples = Vec::with_capacity(rows.len());
        let mut args = Vec::with_capacity(rows.len() * columns.len());
        for row in rows {
            if row.len() != columns.len() {
                return Err(DataError::invalid(format!(
                    "insert {table}: row has {} values for {} columns",
                    row.len(),
                    columns.len()
                )));
            }
            let placeholders: Vec<_> = row
                .iter()
                .map(|_| {
                    let placeholder = dialect.placeholder(placeholder_idx);
                    placeholder_idx += 1;
                    placeholder
                })
                .collect();
            tuples.push(format!("({})", placeholders.join(", ")));
            args.extend(row);
        }

        Ok(Statement::new(
            table,
            format!(
                "INSERT INTO {table} ({column_list}) VALUES {}",
                tuples.join(", ")
            ),
            args,
        ))
    }

    fn checked_table(&self) -> Result<&str, DataError> {
        format_identifier_checked(&self.table, "table")
    }
}

fn append_clause(sql: &mut String, clause: &str) {
    if !clause.is_empty() {
        sql.push(' ');
        sql.push_str(clause);
    }
}

fn format_column_list_checked(columns: &[&str]) -> Result<String, DataError> {
    if columns.is_empty() {
        return Err(DataError::invalid("column list is empty"));
    }
    let mut out = Vec::with_capacity(columns.len());
    for col in columns {
        out.push(format_identifier_checked(col, "column")?);
    }
    Ok(out.join(", "))
}

fn format_identifier_checked<'s>(ident: &'s str, kind: &'static str) -> Result<&'s str, DataError> {
    if is_valid_identifier(ident) {
        Ok(ident)
    } else {
        Err(DataError::invalid(format!("invalid {kind} identifier: {ident}")))
    }
}

#[cfg(test)]
mod tests {
    use hcm_filter::{AtomRule, LogicOperator};

    use super::*;
    use crate::page::Order;

    #[test]
    fn test_select_page() {
        let stmt = QueryBuilder::new("security_group")
            .build_select(
                &["id", "name"],
                &Expression::in_ids(["7", "8"]),
                &BasePage::new(0, 10),
                &PageSqlOption::default(),
            )
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT id, name FROM security_group WHERE id IN (?, ?) ORDER BY id ASC LIMIT 10 OFFSET 0"
        );
        assert_eq!(stmt.args, vec![SqlArg::from("7"), SqlArg::from("8")]);
    }

    #[test]
    fn test_select_everything() {
        let stmt = QueryBuilder::new("region")
            .build_select(
                &["id"],
                &Expression::all(),
                &BasePage::unlimited().with_sort("name", Order::Desc),
                &PageSqlOption::default(),
            )
            .unwrap();
        assert_eq!(stmt.sql, "SELECT id FROM region ORDER BY name DESC");
        assert!(stmt.args.is_empty());
    }

    #[test]
    fn test_count_query() {
        let stmt = QueryBuilder::new("region")
            .build_count(&Expression::and([AtomRule::eq("vendor", "aws")]))
            .unwrap();
        assert_eq!(stmt.sql, "SELECT COUNT(*) FROM region WHERE vendor = ?");
        assert_eq!(stmt.args, vec![SqlArg::from("aws")]);
    }

    #[test]
    fn test_postgres_update_numbers_where_after_set() {
        let stmt = QueryBuilder::new_with_dialect("security_group", Dialect::Postgres)
            .build_update(
                vec![("name", "web".into()), ("memo", "edge".into())],
                &Expression::and([AtomRule::eq("id", "1"), AtomRule::eq("vendor", "tcloud")]),
            )
            .unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE security_group SET name = $1, memo = $2 WHERE id = $3 AND vendor = $4"
        );
        assert_eq!(stmt.args.len(), 4);
        assert_eq!(stmt.args[0], SqlArg::from("web"));
        assert_eq!(stmt.args[2], SqlArg::from("1"));
    }

    #[test]
    fn test_delete_and_update_need_a_filter() {
        let builder = QueryBuilder::new("region");
        assert!(builder.build_delete(&Expression::all()).is_err());
        assert!(builder
            .build_update(vec![("name", "x".into())], &Expression::all())
            .is_err());
        assert!(builder
            .build_update(Vec::new(), &Expression::in_ids(["1"]))
            .is_err());

        let stmt = builder.build_delete(&Expression::in_ids(["1"])).unwrap();
        assert_eq!(stmt.sql, "DELETE FROM region WHERE id IN (?)");
    }

    #[test]
    fn test_multi_row_insert() {
        let stmt = QueryBuilder::new_with_dialect("region", Dialect::Postgres)
            .build_insert(
                &["id", "name"],
                vec![
                    vec!["1".into(), "a".into()],
                    vec!["2".into(), "b".into()],
                ],
            )
            .unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO region (id, name) VALUES ($1, $2), ($3, $4)"
        );
        assert_eq!(stmt.args.len(), 4);

        let short_row = QueryBuilder::new("region").build_insert(&["id", "name"], vec![vec!["1".into()]]);
        assert!(short_row.is_err());
    }

    #[test]
    fn test_crowned_rules_apply_to_every_statement() {
        let builder = QueryBuilder::new("security_group").where_option(
            SqlWhereOption::default().with_crowned(LogicOperator::And, vec![AtomRule::eq("vendor", "aws")]),
        );
        let stmt = builder.build_count(&Expression::all()).unwrap();
        assert_eq!(stmt.sql, "SELECT COUNT(*) FROM security_group WHERE vendor = ?");
    }

    #[test]
    fn test_invalid_identifier() {
        let err = QueryBuilder::new("users;drop")
            .build_count(&Expression::all())
            .unwrap_err();
        assert!(matches!(err, DataError::InvalidParameter(_)));

        let err = QueryBuilder::new("users")
            .build_select(&["id, secret"], &Expression::all(), &BasePage::new(0, 1), &PageSqlOption::default())
            .unwrap_err();
        assert!(err.to_string().contains("column"));
    }
}
