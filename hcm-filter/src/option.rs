use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::dialect::is_valid_segment;

pub const DEFAULT_MAX_IN_LIMIT: usize = 500;
pub const DEFAULT_MAX_NOT_IN_LIMIT: usize = 500;
pub const DEFAULT_MAX_RULES_LIMIT: usize = 10;
pub const DEFAULT_MAX_DEPTH: usize = 4;

/// Allow-list suffix admitting any key under a JSON column: `extension.*`.
pub const WILDCARD: &str = "*";

/// Value type of a filterable column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Numeric,
    Boolean,
    /// RFC3339 timestamps.
    Time,
    /// Any JSON value.
    Json,
}

/// Per call-site limits and field allow-list for filter validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprOption {
    pub rule_fields: HashMap<String, ColumnType>,
    pub max_in_limit: usize,
    pub max_not_in_limit: usize,
    /// Maximum rules per expression level.
    pub max_rules_limit: usize,
    /// Maximum nesting; the top-level expression is depth 1.
    pub max_depth: usize,
}

impl ExprOption {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, ColumnType)>,
        S: Into<String>,
    {
        Self {
            rule_fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            ..Self::default()
        }
    }

    pub fn with_field(mut self, field: impl Into<String>, ty: ColumnType) -> Self {
        self.rule_fields.insert(field.into(), ty);
        self
    }

    pub fn with_max_in_limit(mut self, limit: usize) -> Self {
        self.max_in_limit = limit;
        self
    }

    pub fn with_max_not_in_limit(mut self, limit: usize) -> Self {
        self.max_not_in_limit = limit;
        self
    }

    pub fn with_max_rules_limit(mut self, limit: usize) -> Self {
        self.max_rules_limit = limit;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Column type of `field`, or `None` when the field is not allowed.
    ///
    /// `col.key` resolves through an explicit entry first, then through a
    /// `col.*` wildcard entry if `key` is a well formed JSON key.
    pub fn field_type(&self, field: &str) -> Option<ColumnType> {
        if let Some(ty) = self.rule_fields.get(field) {
            return Some(*ty);
        }
        let (column, key) = field.split_once('.')?;
        if key.is_empty() || !key.split('.').all(is_valid_segment) {
            return None;
        }
        self.rule_fields.get(&format!("{column}.{WILDCARD}")).copied()
    }

    pub fn is_allowed(&self, field: &str) -> bool {
        self.field_type(field).is_some()
    }
}

impl Default for ExprOption {
    fn default() -> Self {
        Self {
            rule_fields: HashMap::new(),
            max_in_limit: DEFAULT_MAX_IN_LIMIT,
            max_not_in_limit: DEFAULT_MAX_NOT_IN_LIMIT,
            max_rules_limit: DEFAULT_MAX_RULES_LIMIT,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_json_keys() {
        let opt = ExprOption::new([("id", ColumnType::String), ("extension.*", ColumnType::Json)])
            .with_field("extension.vpc_id", ColumnType::String);

        assert_eq!(opt.field_type("id"), Some(ColumnType::String));
        assert_eq!(opt.field_type("extension.vpc_id"), Some(ColumnType::String));
        assert_eq!(opt.field_type("extension.zone"), Some(ColumnType::Json));
        assert_eq!(opt.field_type("extension.bad key"), None);
        assert_eq!(opt.field_type("extension."), None);
        assert_eq!(opt.field_type("name"), None);
        assert_eq!(opt.field_type("memo.note"), None);
    }
}
