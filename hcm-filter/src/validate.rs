use serde_json::Value;

use crate::expression::{AtomRule, Expression, Rule};
use crate::operator::is_rfc3339;
use crate::option::{ColumnType, ExprOption};
use crate::FilterError;

impl Expression {
    /// Check the tree against an allow-list and limits. Pure: no I/O.
    ///
    /// The empty top-level expression is valid and selects every row; an
    /// empty nested expression is not.
    pub fn validate(&self, opt: &ExprOption) -> Result<(), FilterError> {
        if self.rules.is_empty() {
            return Ok(());
        }
        self.validate_level(opt, 1)
    }

    fn validate_level(&self, opt: &ExprOption, depth: usize) -> Result<(), FilterError> {
        if depth > opt.max_depth {
            return Err(FilterError::invalid(format!(
                "expression nesting exceeds the maximum depth {}",
                opt.max_depth
            )));
        }
        if self.rules.is_empty() {
            return Err(FilterError::invalid("nested expression rules can not be empty"));
        }
        if self.rules.len() > opt.max_rules_limit {
            return Err(FilterError::invalid(format!(
                "expression rules exceed the maximum {} rules per level",
                opt.max_rules_limit
            )));
        }
        for rule in &self.rules {
            match rule {
                Rule::Atom(atom) => atom.validate(opt)?,
                Rule::Expr(expr) => expr.validate_level(opt, depth + 1)?,
            }
        }
        Ok(())
    }
}

impl AtomRule {
    pub fn validate(&self, opt: &ExprOption) -> Result<(), FilterError> {
        if self.field.is_empty() {
            return Err(FilterError::invalid("rule field can not be empty"));
        }
        let ty = opt
            .field_type(&self.field)
            .ok_or_else(|| FilterError::invalid(format!("rule field: {} is not allowed", self.field)))?;
        if self.value.is_null() {
            return Err(FilterError::invalid(format!(
                "rule value of field {} can not be null",
                self.field
            )));
        }

        self.op.validate_value(&self.field, &self.value, opt)?;

        if self.op.checks_column_type() {
            let ok = match &self.value {
                Value::Array(items) => items.iter().all(|v| matches_column(ty, v)),
                v => matches_column(ty, v),
            };
            if !ok {
                return Err(FilterError::invalid(format!(
                    "rule value of field {} does not match its column type {ty:?}",
                    self.field
                )));
            }
        }
        Ok(())
    }
}

fn matches_column(ty: ColumnType, v: &Value) -> bool {
    match ty {
        ColumnType::String => v.is_string(),
        ColumnType::Numeric => v.is_number(),
        ColumnType::Boolean => v.is_boolean(),
        ColumnType::Time => v.as_str().is_some_and(is_rfc3339),
        ColumnType::Json => true,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::OpType;

    fn option() -> ExprOption {
        ExprOption::new([
            ("id", ColumnType::String),
            ("name", ColumnType::String),
            ("vendor", ColumnType::String),
            ("bk_biz_id", ColumnType::Numeric),
            ("created_at", ColumnType::Time),
            ("tags", ColumnType::Json),
            ("extension.*", ColumnType::Json),
        ])
    }

    fn invalid(expr: Expression) -> String {
        match expr.validate(&option()) {
            Err(FilterError::InvalidParameter(msg)) => msg,
            other => panic!("expected InvalidParameter, got {other:?}"),
        }
    }

    #[test]
    fn empty_top_level_is_valid() {
        assert!(Expression::all().validate(&option()).is_ok());
    }

    #[test]
    fn disallowed_field() {
        let msg = invalid(Expression::equal("password", "x"));
        assert!(msg.contains("password"));
    }

    #[test]
    fn null_value() {
        invalid(Expression::equal("name", Value::Null));
    }

    #[test]
    fn value_shapes() {
        assert!(Expression::equal("name", "web").validate(&option()).is_ok());
        invalid(Expression::equal("name", json!(["web"])));
        invalid(Expression::and([AtomRule::in_("id", json!([]))]));
        invalid(Expression::and([AtomRule::in_("id", json!([["nested"]]))]));
        invalid(Expression::and([AtomRule::in_("id", "7")]));
        invalid(Expression::and([AtomRule::cs("name", "")]));
        invalid(Expression::and([AtomRule::gt("bk_biz_id", "ten")]));
        assert!(Expression::and([AtomRule::gt("created_at", "2024-01-01T00:00:00Z")])
            .validate(&option())
            .is_ok());
        invalid(Expression::and([AtomRule::json_length("tags", -1)]));
    }

    #[test]
    fn column_type_mismatch() {
        invalid(Expression::equal("bk_biz_id", "3"));
        invalid(Expression::and([AtomRule::in_("bk_biz_id", json!([1, "2"]))]));
        invalid(Expression::equal("created_at", "2024-01-01"));
        assert!(Expression::and([AtomRule::in_("bk_biz_id", json!([1, 2]))])
            .validate(&option())
            .is_ok());
    }

    #[test]
    fn in_limits() {
        let opt = option().with_max_in_limit(2).with_max_not_in_limit(1);
        assert!(Expression::in_ids(["1", "2"]).validate(&opt).is_ok());
        assert!(Expression::in_ids(["1", "2", "3"]).validate(&opt).is_err());
        assert!(Expression::and([AtomRule::nin("id", json!(["1", "2"]))])
            .validate(&opt)
            .is_err());
    }

    #[test]
    fn id_gt_only_on_id() {
        assert!(Expression::and([AtomRule::id_gt("00000010")]).validate(&option()).is_ok());
        let msg = invalid(Expression::and([AtomRule::new("name", OpType::IdGreaterThan, "a")]));
        assert!(msg.contains("id"));
    }

    #[test]
    fn json_paths_and_keys() {
        let path = AtomRule::new("tags", OpType::JsonContainsPath, "cloud.zone");
        assert!(Expression::and([path]).validate(&option()).is_ok());
        let bad_path = AtomRule::new("tags", OpType::JsonContainsPath, "cloud zone");
        invalid(Expression::and([bad_path]));
        assert!(Expression::and([AtomRule::json_eq("extension.vpc_id", "vpc-1")])
            .validate(&option())
            .is_ok());
    }

    #[test]
    fn json_keys_accept_equality_but_not_ordering() {
        assert!(Expression::and([
            AtomRule::eq("extension.vpc_id", "vpc-1"),
            AtomRule::in_("extension.zone", json!(["z1", "z2"])),
            AtomRule::cis("extension.memo", "web"),
        ])
        .validate(&option())
        .is_ok());
        let msg = invalid(Expression::and([AtomRule::gte("extension.port", 80)]));
        assert!(msg.contains("extension.port"));
    }

    #[test]
    fn rules_per_level_and_depth() {
        let opt = option().with_max_rules_limit(2).with_max_depth(2);
        let three = Expression::and([
            AtomRule::eq("name", "a"),
            AtomRule::eq("name", "b"),
            AtomRule::eq("name", "c"),
        ]);
        assert!(three.validate(&opt).is_err());

        let depth2 = Expression::and([Expression::or([AtomRule::eq("name", "a")])]);
        assert!(depth2.validate(&opt).is_ok());
        let depth3 = Expression::and([Expression::and([Expression::or([AtomRule::eq("name", "a")])])]);
        assert!(depth3.validate(&opt).is_err());
    }

    #[test]
    fn nested_empty_expression_is_invalid() {
        let expr = Expression::and([Rule::from(AtomRule::eq("name", "a")), Rule::from(Expression::all())]);
        let msg = invalid(expr);
        assert!(msg.contains("empty"));
    }
}
