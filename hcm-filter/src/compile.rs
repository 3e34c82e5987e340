//! Compilation of validated expressions into parameterized SQL predicates.

use chrono::Utc;
use serde_json::Value;

use crate::dialect::{check_identifier, Dialect};
use crate::expression::{AtomRule, Expression, LogicOperator, Rule};
use crate::{FilterError, SqlArg};

/// Server-side rules merged into every caller expression, e.g. tenant scoping.
#[derive(Debug, Clone, PartialEq)]
pub struct CrownedOption {
    /// How the crowned rules combine with the caller's expression.
    pub op: LogicOperator,
    /// ANDed together.
    pub rules: Vec<AtomRule>,
}

/// Options controlling how an expression becomes SQL.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlWhereOption {
    pub dialect: Dialect,
    /// Fields moved to the front of each level, in this order, so predicates
    /// follow index column order.
    pub priority: Vec<String>,
    pub crowned: Option<CrownedOption>,
    /// Fields whose RFC3339 values are normalised to UTC `YYYY-MM-DD HH:MM:SS`.
    pub time_fields: Vec<String>,
}

impl SqlWhereOption {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    pub fn with_priority<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.priority = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_crowned(mut self, op: LogicOperator, rules: Vec<AtomRule>) -> Self {
        self.crowned = Some(CrownedOption { op, rules });
        self
    }

    pub fn with_time_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.time_fields = fields.into_iter().map(Into::into).collect();
        self
    }
}

impl Default for SqlWhereOption {
    fn default() -> Self {
        Self {
            dialect: Dialect::Generic,
            priority: vec!["id".to_string()],
            crowned: None,
            time_fields: vec!["created_at".to_string(), "updated_at".to_string()],
        }
    }
}

/// A compiled predicate: `sql` holds exactly `args.len()` placeholders.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WhereClause {
    pub sql: String,
    pub args: Vec<SqlArg>,
}

impl WhereClause {
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// `WHERE <sql>`, or an empty string when the clause matches everything.
    pub fn where_sql(&self) -> String {
        if self.sql.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.sql)
        }
    }

    pub fn into_parts(self) -> (String, Vec<SqlArg>) {
        (self.sql, self.args)
    }
}

impl Expression {
    /// Compile with placeholders numbered from 1.
    pub fn compile(&self, opt: &SqlWhereOption) -> Result<WhereClause, FilterError> {
        self.compile_from(opt, 1)
    }

    /// Compile with placeholders numbered from `first_placeholder`, for
    /// predicates that follow other bound values (an UPDATE SET list).
    pub fn compile_from(
        &self,
        opt: &SqlWhereOption,
        first_placeholder: usize,
    ) -> Result<WhereClause, FilterError> {
        let mut w = SqlWriter::new(opt, first_placeholder);
        let sql = w.top_level(self)?;
        tracing::trace!(sql = %sql, args = w.args.len(), "compiled filter expression");
        Ok(WhereClause { sql, args: w.args })
    }
}

/// Accumulates bound values while SQL text is produced left to right.
pub(crate) struct SqlWriter<'a> {
    opt: &'a SqlWhereOption,
    args: Vec<SqlArg>,
    next: usize,
}

impl<'a> SqlWriter<'a> {
    fn new(opt: &'a SqlWhereOption, first_placeholder: usize) -> Self {
        Self {
            opt,
            args: Vec::new(),
            next: first_placeholder.max(1),
        }
    }

    pub(crate) fn dialect(&self) -> Dialect {
        self.opt.dialect
    }

    pub(crate) fn bind(&mut self, arg: SqlArg) -> String {
        let placeholder = self.opt.dialect.placeholder(self.next);
        self.next += 1;
        self.args.push(arg);
        placeholder
    }

    /// Bind a column value, normalising time fields.
    pub(crate) fn bind_value(&mut self, field: &str, value: &Value) -> Result<String, FilterError> {
        let arg = match value {
            Value::String(s) if self.opt.time_fields.iter().any(|f| f == field) => {
                let parsed = chrono::DateTime::parse_from_rfc3339(s).map_err(|_| {
                    FilterError::invalid(format!("{field} value should be an RFC3339 time, got {s}"))
                })?;
                SqlArg::Text(parsed.with_timezone(&Utc).format("%Y-%m-%d %H:%M:%S").to_string())
            }
            Value::Null | Value::Array(_) | Value::Object(_) => {
                return Err(FilterError::invalid(format!(
                    "value of field {field} should be a string, number or bool"
                )))
            }
            other => SqlArg::from_json(other),
        };
        Ok(self.bind(arg))
    }

    pub(crate) fn bind_list(&mut self, field: &str, values: &[Value]) -> Result<String, FilterError> {
        let mut placeholders = Vec::with_capacity(values.len());
        for v in values {
            placeholders.push(self.bind_value(field, v)?);
        }
        Ok(placeholders.join(", "))
    }

    /// Bind a value compared against extracted JSON; Postgres extracts text.
    pub(crate) fn bind_json(&mut self, value: &Value) -> String {
        let arg = SqlArg::from_json(value);
        match self.opt.dialect {
            Dialect::Postgres => self.bind(arg.into_text()),
            _ => self.bind(arg),
        }
    }

    pub(crate) fn bind_json_list(&mut self, values: &[Value]) -> String {
        values
            .iter()
            .map(|v| self.bind_json(v))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn top_level(&mut self, expr: &Expression) -> Result<String, FilterError> {
        let opt = self.opt;
        let crowned = opt.crowned.as_ref().filter(|c| !c.rules.is_empty());
        let Some(crowned) = crowned else {
            if expr.is_empty() {
                return Ok(String::new());
            }
            return self.level(expr.op, &expr.rules);
        };

        let crown_rules: Vec<Rule> = crowned.rules.iter().cloned().map(Rule::Atom).collect();
        if expr.is_empty() {
            return self.level(LogicOperator::And, &crown_rules);
        }
        if expr.op == LogicOperator::And && crowned.op == LogicOperator::And {
            let mut merged = expr.rules.clone();
            merged.extend(crown_rules);
            return self.level(LogicOperator::And, &merged);
        }

        let joiner = crowned.op.sql();
        if self.first_hit(&crown_rules) < self.first_hit(&expr.rules) {
            let c = self.level(LogicOperator::And, &crown_rules)?;
            let e = self.level(expr.op, &expr.rules)?;
            Ok(format!("({c}){joiner}({e})"))
        } else {
            let e = self.level(expr.op, &expr.rules)?;
            let c = self.level(LogicOperator::And, &crown_rules)?;
            Ok(format!("({e}){joiner}({c})"))
        }
    }

    fn level(&mut self, op: LogicOperator, rules: &[Rule]) -> Result<String, FilterError> {
        if rules.is_empty() {
            return Err(FilterError::invalid("expression rules can not be empty"));
        }
        let mut parts = Vec::with_capacity(rules.len());
        for rule in self.arrange(rules) {
            match rule {
                Rule::Atom(atom) => {
                    check_identifier(&atom.field, "field")?;
                    parts.push(atom.op.render(&atom.field, &atom.value, self)?);
                }
                Rule::Expr(sub) => parts.push(format!("({})", self.level(sub.op, &sub.rules)?)),
            }
        }
        Ok(parts.join(op.sql()))
    }

    fn priority_of(&self, rule: &Rule) -> usize {
        match rule {
            Rule::Atom(atom) => self
                .opt
                .priority
                .iter()
                .position(|p| *p == atom.field)
                .unwrap_or(self.opt.priority.len()),
            Rule::Expr(_) => self.opt.priority.len(),
        }
    }

    /// Stable reorder: priority atoms first, the rest in caller order.
    fn arrange<'r>(&self, rules: &'r [Rule]) -> Vec<&'r Rule> {
        let mut ordered: Vec<&Rule> = rules.iter().collect();
        ordered.sort_by_key(|r| self.priority_of(r));
        ordered
    }

    fn first_hit(&self, rules: &[Rule]) -> usize {
        rules
            .iter()
            .map(|r| self.priority_of(r))
            .min()
            .unwrap_or(usize::MAX)
    }
}
