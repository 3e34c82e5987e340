//! In-memory evaluation of expressions against JSON rows.
//!
//! Mirrors the SQL semantics closely enough to filter cached rows and to
//! cross-check compiled predicates.

use std::cmp::Ordering;

use serde_json::Value;

use crate::expression::{AtomRule, Expression, LogicOperator, Rule};
use crate::OpType;

impl Expression {
    /// Whether `row` (a JSON object) satisfies the expression. Empty matches.
    pub fn matches(&self, row: &Value) -> bool {
        if self.rules.is_empty() {
            return true;
        }
        let mut results = self.rules.iter().map(|rule| match rule {
            Rule::Atom(atom) => atom.matches(row),
            Rule::Expr(expr) => !expr.rules.is_empty() && expr.matches(row),
        });
        match self.op {
            LogicOperator::And => results.all(|r| r),
            LogicOperator::Or => results.any(|r| r),
        }
    }
}

fn lookup<'v>(row: &'v Value, field: &str) -> Option<&'v Value> {
    if let Some(v) = row.get(field) {
        return Some(v);
    }
    let (col, key) = field.split_once('.')?;
    row.get(col)?.get(key)
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => {
            match (
                chrono::DateTime::parse_from_rfc3339(x),
                chrono::DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(tx), Ok(ty)) => Some(tx.cmp(&ty)),
                _ => Some(x.cmp(y)),
            }
        }
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn equals(a: &Value, b: &Value) -> bool {
    compare(a, b) == Some(Ordering::Equal)
}

fn path_exists(doc: &Value, path: &str) -> bool {
    path.split('.')
        .try_fold(doc, |cur, seg| cur.get(seg))
        .is_some()
}

impl AtomRule {
    /// A missing or null column never matches, as with SQL `NULL`.
    pub fn matches(&self, row: &Value) -> bool {
        let actual = match lookup(row, &self.field) {
            Some(v) if !v.is_null() => v,
            _ => return false,
        };
        let expected = &self.value;
        let list = || expected.as_array().map(Vec::as_slice).unwrap_or_default();
        match self.op {
            OpType::Equal | OpType::JsonEqual => equals(actual, expected),
            OpType::NotEqual | OpType::JsonNotEqual => {
                compare(actual, expected).is_some_and(|o| o != Ordering::Equal)
            }
            OpType::IdGreaterThan | OpType::GreaterThan => {
                compare(actual, expected) == Some(Ordering::Greater)
            }
            OpType::GreaterThanEqual => {
                matches!(compare(actual, expected), Some(Ordering::Greater | Ordering::Equal))
            }
            OpType::LessThan => compare(actual, expected) == Some(Ordering::Less),
            OpType::LessThanEqual => {
                matches!(compare(actual, expected), Some(Ordering::Less | Ordering::Equal))
            }
            OpType::In | OpType::JsonIn => list().iter().any(|v| equals(actual, v)),
            OpType::NotIn => !list().iter().any(|v| equals(actual, v)),
            OpType::ContainsSensitive => match (actual.as_str(), expected.as_str()) {
                (Some(a), Some(e)) => a.contains(e),
                _ => false,
            },
            OpType::ContainsInsensitive => match (actual.as_str(), expected.as_str()) {
                (Some(a), Some(e)) => a.to_lowercase().contains(&e.to_lowercase()),
                _ => false,
            },
            OpType::JsonContains => actual
                .as_array()
                .is_some_and(|items| items.iter().any(|v| equals(v, expected))),
            OpType::JsonOverlaps => actual.as_array().is_some_and(|items| {
                items.iter().any(|v| list().iter().any(|e| equals(v, e)))
            }),
            OpType::JsonContainsPath => expected.as_str().is_some_and(|p| path_exists(actual, p)),
            OpType::JsonNotContainsPath => {
                expected.as_str().is_some_and(|p| !path_exists(actual, p))
            }
            OpType::JsonLength => match (actual.as_array(), expected.as_u64()) {
                (Some(items), Some(n)) => items.len() as u64 == n,
                _ => false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn evaluates_against_rows() {
        let row = json!({
            "id": "00000008",
            "name": "Web-Prod",
            "bk_biz_id": 3,
            "tags": ["a", "b"],
            "extension": {"vpc_id": "vpc-1", "cloud": {"zone": "z1"}},
            "memo": null
        });

        assert!(Expression::equal("extension.vpc_id", "vpc-1").matches(&row));
        assert!(Expression::and([AtomRule::cis("name", "web")]).matches(&row));
        assert!(!Expression::and([AtomRule::cs("name", "web")]).matches(&row));
        assert!(Expression::and([AtomRule::gte("bk_biz_id", 3)]).matches(&row));
        assert!(Expression::and([AtomRule::id_gt("00000007")]).matches(&row));
        assert!(Expression::and([AtomRule::json_overlaps("tags", json!(["b", "c"]))]).matches(&row));
        assert!(Expression::and([AtomRule::json_length("tags", 2)]).matches(&row));
        assert!(Expression::and([AtomRule::new(
            "extension",
            OpType::JsonContainsPath,
            "cloud.zone"
        )])
        .matches(&row));
        assert!(!Expression::equal("memo", "x").matches(&row));
        assert!(!Expression::and([AtomRule::neq("memo", "x")]).matches(&row));
        assert!(Expression::all().matches(&row));
    }
}
