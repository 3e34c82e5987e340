use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::compile::SqlWriter;
use crate::dialect::{is_valid_segment, Dialect};
use crate::option::ExprOption;
use crate::{FilterError, SqlArg};

/// Comparison operator of an [`AtomRule`](crate::AtomRule). Serialized by wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpType {
    #[serde(rename = "eq")]
    Equal,
    #[serde(rename = "neq")]
    NotEqual,
    /// `id > value`, only valid on the `id` field; drives keyset pagination.
    #[serde(rename = "id_gt")]
    IdGreaterThan,
    #[serde(rename = "gt")]
    GreaterThan,
    #[serde(rename = "gte")]
    GreaterThanEqual,
    #[serde(rename = "lt")]
    LessThan,
    #[serde(rename = "lte")]
    LessThanEqual,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "nin")]
    NotIn,
    /// Case-sensitive substring match.
    #[serde(rename = "cs")]
    ContainsSensitive,
    /// Case-insensitive substring match.
    #[serde(rename = "cis")]
    ContainsInsensitive,
    #[serde(rename = "json_eq")]
    JsonEqual,
    #[serde(rename = "json_neq")]
    JsonNotEqual,
    #[serde(rename = "json_in")]
    JsonIn,
    /// The JSON array holds the value.
    #[serde(rename = "json_contains")]
    JsonContains,
    /// The JSON array holds at least one of the values.
    #[serde(rename = "json_overlaps")]
    JsonOverlaps,
    #[serde(rename = "json_contains_path")]
    JsonContainsPath,
    #[serde(rename = "json_not_contains_path")]
    JsonNotContainsPath,
    #[serde(rename = "json_length")]
    JsonLength,
}

fn is_basic(v: &Value) -> bool {
    matches!(v, Value::Bool(_) | Value::Number(_) | Value::String(_))
}

pub(crate) fn is_rfc3339(s: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(s).is_ok()
}

fn basic_list<'v>(
    op: OpType,
    field: &str,
    value: &'v Value,
    limit: usize,
) -> Result<&'v [Value], FilterError> {
    let list = value.as_array().ok_or_else(|| {
        FilterError::invalid(format!("{op} operator's value of field {field} should be an array"))
    })?;
    if list.is_empty() {
        return Err(FilterError::invalid(format!(
            "{op} operator's value of field {field} can not be an empty array"
        )));
    }
    if list.len() > limit {
        return Err(FilterError::invalid(format!(
            "{op} operator's value of field {field} exceeds the maximum {limit} elements"
        )));
    }
    if !list.iter().all(is_basic) {
        return Err(FilterError::invalid(format!(
            "{op} operator's value of field {field} should only contain basic type elements"
        )));
    }
    Ok(list)
}

fn non_empty_str<'v>(op: OpType, field: &str, value: &'v Value) -> Result<&'v str, FilterError> {
    match value.as_str() {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(FilterError::invalid(format!(
            "{op} operator's value of field {field} should be a non-empty string"
        ))),
    }
}

/// `a.b` → `$."a"."b"` after checking every segment.
fn json_path(op: OpType, field: &str, value: &Value) -> Result<String, FilterError> {
    let path = non_empty_str(op, field, value)?;
    if !path.split('.').all(is_valid_segment) {
        return Err(FilterError::invalid(format!(
            "{op} operator's path of field {field} is invalid: {path}"
        )));
    }
    let quoted: Vec<String> = path.split('.').map(|seg| format!("\"{seg}\"")).collect();
    Ok(format!("$.{}", quoted.join(".")))
}

/// Text of a JSON key: `extension.vpc_id` addresses key `vpc_id` of column `extension`.
fn json_text(field: &str, dialect: Dialect) -> String {
    match field.split_once('.') {
        None => field.to_string(),
        Some((col, key)) => match dialect {
            Dialect::Sqlite => format!("json_extract({col}, '$.\"{key}\"')"),
            Dialect::Postgres => format!("{col}->>'{key}'"),
            Dialect::MySql | Dialect::Generic => format!("{col}->>'$.\"{key}\"'"),
        },
    }
}

/// JSON document of a column or key, for containment and length checks.
fn json_doc(field: &str, dialect: Dialect) -> String {
    match (field.split_once('.'), dialect) {
        (None, Dialect::Postgres) => format!("{field}::jsonb"),
        (None, _) => field.to_string(),
        (Some((col, key)), Dialect::Postgres) => format!("({col}::jsonb -> '{key}')"),
        (Some(_), _) => json_text(field, dialect),
    }
}

const LIKE_ESCAPE: char = '!';

/// `%s%` with the LIKE wildcards of `s` escaped by [`LIKE_ESCAPE`].
fn like_pattern(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('%');
    for c in s.chars() {
        if matches!(c, '%' | '_') || c == LIKE_ESCAPE {
            out.push(LIKE_ESCAPE);
        }
        out.push(c);
    }
    out.push('%');
    out
}

/// Column values bind as-is; JSON keys compare against extracted text on Postgres.
fn bind_scalar(w: &mut SqlWriter<'_>, field: &str, value: &Value) -> Result<String, FilterError> {
    if field.contains('.') {
        if !is_basic(value) {
            return Err(FilterError::invalid(format!(
                "value of field {field} should be a string, number or bool"
            )));
        }
        Ok(w.bind_json(value))
    } else {
        w.bind_value(field, value)
    }
}

impl OpType {
    /// Ordering comparisons only apply to plain columns.
    pub(crate) fn orders(self) -> bool {
        matches!(
            self,
            OpType::IdGreaterThan
                | OpType::GreaterThan
                | OpType::GreaterThanEqual
                | OpType::LessThan
                | OpType::LessThanEqual
        )
    }

    fn keyed_field_error(self, field: &str) -> FilterError {
        FilterError::invalid(format!(
            "{self} operator does not support the json key field {field}"
        ))
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            OpType::Equal => "eq",
            OpType::NotEqual => "neq",
            OpType::IdGreaterThan => "id_gt",
            OpType::GreaterThan => "gt",
            OpType::GreaterThanEqual => "gte",
            OpType::LessThan => "lt",
            OpType::LessThanEqual => "lte",
            OpType::In => "in",
            OpType::NotIn => "nin",
            OpType::ContainsSensitive => "cs",
            OpType::ContainsInsensitive => "cis",
            OpType::JsonEqual => "json_eq",
            OpType::JsonNotEqual => "json_neq",
            OpType::JsonIn => "json_in",
            OpType::JsonContains => "json_contains",
            OpType::JsonOverlaps => "json_overlaps",
            OpType::JsonContainsPath => "json_contains_path",
            OpType::JsonNotContainsPath => "json_not_contains_path",
            OpType::JsonLength => "json_length",
        }
    }

    /// Whether the rule value must also match the column's declared type.
    /// Path and length operators take values unrelated to the column contents.
    pub(crate) fn checks_column_type(self) -> bool {
        !matches!(
            self,
            OpType::JsonContainsPath | OpType::JsonNotContainsPath | OpType::JsonLength
        )
    }

    /// Check the value shape this operator requires.
    pub(crate) fn validate_value(
        self,
        field: &str,
        value: &Value,
        opt: &ExprOption,
    ) -> Result<(), FilterError> {
        if self.orders() && field.contains('.') {
            return Err(self.keyed_field_error(field));
        }
        match self {
            OpType::Equal
            | OpType::NotEqual
            | OpType::JsonEqual
            | OpType::JsonNotEqual
            | OpType::JsonContains
            | OpType::IdGreaterThan => {
                if self == OpType::IdGreaterThan && field != "id" {
                    return Err(FilterError::invalid(format!(
                        "{self} operator only supports the id field, got {field}"
                    )));
                }
                if !is_basic(value) {
                    return Err(FilterError::invalid(format!(
                        "{self} operator's value of field {field} should be a string, number or bool"
                    )));
                }
                Ok(())
            }
            OpType::GreaterThan
            | OpType::GreaterThanEqual
            | OpType::LessThan
            | OpType::LessThanEqual => match value {
                Value::Number(_) => Ok(()),
                Value::String(s) if is_rfc3339(s) => Ok(()),
                _ => Err(FilterError::invalid(format!(
                    "{self} operator's value of field {field} should be a number or an RFC3339 time"
                ))),
            },
            OpType::In | OpType::JsonIn | OpType::JsonOverlaps => {
                basic_list(self, field, value, opt.max_in_limit).map(|_| ())
            }
            OpType::NotIn => basic_list(self, field, value, opt.max_not_in_limit).map(|_| ()),
            OpType::ContainsSensitive | OpType::ContainsInsensitive => {
                non_empty_str(self, field, value).map(|_| ())
            }
            OpType::JsonContainsPath | OpType::JsonNotContainsPath => {
                json_path(self, field, value).map(|_| ())
            }
            OpType::JsonLength => match value.as_u64() {
                Some(_) => Ok(()),
                None => Err(FilterError::invalid(format!(
                    "{self} operator's value of field {field} should be a non-negative integer"
                ))),
            },
        }
    }

    /// Render `field <op> placeholder(s)`, binding values on `w` in order.
    pub(crate) fn render(
        self,
        field: &str,
        value: &Value,
        w: &mut SqlWriter<'_>,
    ) -> Result<String, FilterError> {
        let dialect = w.dialect();
        let unbounded = usize::MAX;
        let col = json_text(field, dialect);
        let keyed = field.contains('.');
        let sql = match self {
            OpType::Equal => format!("{col} = {}", bind_scalar(w, field, value)?),
            OpType::NotEqual => format!("{col} != {}", bind_scalar(w, field, value)?),
            OpType::IdGreaterThan
            | OpType::GreaterThan
            | OpType::GreaterThanEqual
            | OpType::LessThan
            | OpType::LessThanEqual => {
                if keyed {
                    return Err(self.keyed_field_error(field));
                }
                let cmp = match self {
                    OpType::GreaterThanEqual => ">=",
                    OpType::LessThan => "<",
                    OpType::LessThanEqual => "<=",
                    _ => ">",
                };
                format!("{field} {cmp} {}", w.bind_value(field, value)?)
            }
            OpType::In | OpType::NotIn => {
                let list = basic_list(self, field, value, unbounded)?;
                let p = if keyed {
                    w.bind_json_list(list)
                } else {
                    w.bind_list(field, list)?
                };
                let not = if self == OpType::NotIn { "NOT " } else { "" };
                format!("{col} {not}IN ({p})")
            }
            OpType::ContainsSensitive => {
                let s = non_empty_str(self, field, value)?;
                match dialect {
                    Dialect::Sqlite => format!("instr({col}, {}) > 0", w.bind(SqlArg::from(s))),
                    Dialect::Postgres => format!(
                        "{col} LIKE {} ESCAPE '{LIKE_ESCAPE}'",
                        w.bind(SqlArg::Text(like_pattern(s)))
                    ),
                    Dialect::MySql | Dialect::Generic => format!(
                        "{col} LIKE BINARY {} ESCAPE '{LIKE_ESCAPE}'",
                        w.bind(SqlArg::Text(like_pattern(s)))
                    ),
                }
            }
            OpType::ContainsInsensitive => {
                let s = non_empty_str(self, field, value)?.to_lowercase();
                format!(
                    "LOWER({col}) LIKE {} ESCAPE '{LIKE_ESCAPE}'",
                    w.bind(SqlArg::Text(like_pattern(&s)))
                )
            }
            OpType::JsonEqual => {
                let p = w.bind_json(value);
                format!("{} = {p}", json_text(field, dialect))
            }
            OpType::JsonNotEqual => {
                let p = w.bind_json(value);
                format!("{} != {p}", json_text(field, dialect))
            }
            OpType::JsonIn => {
                let list = basic_list(self, field, value, unbounded)?;
                let p = w.bind_json_list(list);
                format!("{} IN ({p})", json_text(field, dialect))
            }
            OpType::JsonContains => {
                let doc = json_doc(field, dialect);
                match dialect {
                    Dialect::Sqlite => format!(
                        "EXISTS (SELECT 1 FROM json_each({doc}) WHERE json_each.value = {})",
                        w.bind_json(value)
                    ),
                    Dialect::Postgres => {
                        format!("{doc} @> jsonb_build_array({})", w.bind(SqlArg::from_json(value)))
                    }
                    Dialect::MySql | Dialect::Generic => {
                        format!("JSON_CONTAINS({doc}, JSON_ARRAY({}))", w.bind_json(value))
                    }
                }
            }
            OpType::JsonOverlaps => {
                let list = basic_list(self, field, value, unbounded)?;
                let doc = json_doc(field, dialect);
                match dialect {
                    Dialect::Sqlite => format!(
                        "EXISTS (SELECT 1 FROM json_each({doc}) WHERE json_each.value IN ({}))",
                        w.bind_json_list(list)
                    ),
                    Dialect::Postgres => {
                        let any: Vec<String> = list
                            .iter()
                            .map(|v| {
                                format!("{doc} @> jsonb_build_array({})", w.bind(SqlArg::from_json(v)))
                            })
                            .collect();
                        format!("({})", any.join(" OR "))
                    }
                    Dialect::MySql | Dialect::Generic => {
                        format!("JSON_OVERLAPS({doc}, JSON_ARRAY({}))", w.bind_json_list(list))
                    }
                }
            }
            OpType::JsonContainsPath | OpType::JsonNotContainsPath => {
                let doc = json_doc(field, dialect);
                let p = w.bind(SqlArg::Text(json_path(self, field, value)?));
                let exists = match dialect {
                    Dialect::Sqlite => format!("json_type({doc}, {p}) IS NOT NULL"),
                    Dialect::Postgres => format!("jsonb_path_exists({doc}, CAST({p} AS jsonpath))"),
                    Dialect::MySql | Dialect::Generic => {
                        format!("JSON_CONTAINS_PATH({doc}, 'one', {p})")
                    }
                };
                if self == OpType::JsonNotContainsPath {
                    format!("NOT ({exists})")
                } else {
                    exists
                }
            }
            OpType::JsonLength => {
                let len = value.as_u64().ok_or_else(|| {
                    FilterError::invalid(format!(
                        "{self} operator's value of field {field} should be a non-negative integer"
                    ))
                })?;
                let doc = json_doc(field, dialect);
                let p = w.bind(SqlArg::Int(i64::try_from(len).unwrap_or(i64::MAX)));
                match dialect {
                    Dialect::Sqlite => format!("json_array_length({doc}) = {p}"),
                    Dialect::Postgres => format!("jsonb_array_length({doc}) = {p}"),
                    Dialect::MySql | Dialect::Generic => format!("JSON_LENGTH({doc}) = {p}"),
                }
            }
        };
        Ok(sql)
    }
}

impl std::fmt::Display for OpType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
