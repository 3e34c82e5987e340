use serde::{Deserialize, Serialize};

use hcm_filter::{ExprOption, Expression};

use crate::page::{BasePage, PageOption};
use crate::DataError;

/// Upper bound on ids accepted by a delete-by-id request.
pub const MAX_BATCH_DELETE_IDS: usize = 500;

/// A list request: which rows, which page, which columns.
///
/// `filter` and `page` are required; they are optional here only so a
/// missing field surfaces as `InvalidParameter` rather than a decode error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListOption {
    #[serde(default)]
    pub filter: Option<Expression>,
    #[serde(default)]
    pub page: Option<BasePage>,
    /// Projected columns; empty selects every column.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
}

/// Wire name of a list request body.
pub type ListReq = ListOption;

impl ListOption {
    pub fn new(filter: Expression, page: BasePage) -> Self {
        Self {
            filter: Some(filter),
            page: Some(page),
            fields: Vec::new(),
        }
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Validate every part against the call-site policies.
    pub fn validate(&self, expr_opt: &ExprOption, page_opt: Option<&PageOption>) -> Result<(), DataError> {
        let filter = self
            .filter
            .as_ref()
            .ok_or_else(|| DataError::invalid("filter is required"))?;
        let page = self
            .page
            .as_ref()
            .ok_or_else(|| DataError::invalid("page is required"))?;

        filter.validate(expr_opt)?;
        page.validate(page_opt)?;

        if !page.sort.is_empty() && !is_column(expr_opt, &page.sort) {
            return Err(DataError::invalid(format!(
                "page.sort: {} is not an allowed column",
                page.sort
            )));
        }
        if let Some(field) = self.fields.iter().find(|f| !is_column(expr_opt, f)) {
            return Err(DataError::invalid(format!("field: {field} is not an allowed column")));
        }
        Ok(())
    }

    /// Borrow the filter and page of a validated option.
    pub fn parts(&self) -> Result<(&Expression, &BasePage), DataError> {
        match (&self.filter, &self.page) {
            (Some(filter), Some(page)) => Ok((filter, page)),
            (None, _) => Err(DataError::invalid("filter is required")),
            (_, None) => Err(DataError::invalid("page is required")),
        }
    }
}

/// List response body. In count mode `details` is empty; in detail mode `count` is 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResult<T> {
    pub count: u64,
    pub details: Vec<T>,
}

impl<T> ListResult<T> {
    pub fn count(count: u64) -> Self {
        Self {
            count,
            details: Vec::new(),
        }
    }

    pub fn details(details: Vec<T>) -> Self {
        Self { count: 0, details }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> ListResult<U> {
        ListResult {
            count: self.count,
            details: self.details.into_iter().map(f).collect(),
        }
    }
}

/// Delete every row matching `filter`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchDeleteReq {
    #[serde(default)]
    pub filter: Option<Expression>,
}

impl BatchDeleteReq {
    pub fn new(filter: Expression) -> Self {
        Self {
            filter: Some(filter),
        }
    }

    /// A delete must name its rows: the filter is required and non-empty.
    pub fn validate(&self, expr_opt: &ExprOption) -> Result<&Expression, DataError> {
        let filter = self
            .filter
            .as_ref()
            .ok_or_else(|| DataError::invalid("filter is required"))?;
        if filter.is_empty() {
            return Err(DataError::invalid("filter can not be empty for delete"));
        }
        filter.validate(expr_opt)?;
        Ok(filter)
    }
}

/// Delete rows by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchDeleteByIdReq {
    #[serde(default)]
    pub ids: Vec<String>,
}

impl BatchDeleteByIdReq {
    pub fn validate(&self) -> Result<(), DataError> {
        if self.ids.is_empty() {
            return Err(DataError::invalid("ids is required"));
        }
        if self.ids.len() > MAX_BATCH_DELETE_IDS {
            return Err(DataError::invalid(format!(
                "ids should be no more than {MAX_BATCH_DELETE_IDS}"
            )));
        }
        if self.ids.iter().any(String::is_empty) {
            return Err(DataError::invalid("ids can not contain an empty id"));
        }
        Ok(())
    }

    pub fn to_filter(&self) -> Expression {
        Expression::in_ids(self.ids.iter().cloned())
    }
}

/// Sorting and projection address whole columns, never JSON keys.
fn is_column(expr_opt: &ExprOption, name: &str) -> bool {
    !name.contains('.') && expr_opt.is_allowed(name)
}

#[cfg(test)]
mod tests {
    use hcm_filter::{AtomRule, ColumnType};
    use serde_json::json;

    use super::*;
    use crate::page::Order;

    fn expr_opt() -> ExprOption {
        ExprOption::new([
            ("id", ColumnType::String),
            ("name", ColumnType::String),
            ("vendor", ColumnType::String),
        ])
    }

    #[test]
    fn decode_list_req() {
        let raw = json!({
            "filter": {"op": "and", "rules": [{"field": "id", "op": "in", "value": ["7", "8"]}]},
            "page": {"count": false, "start": 0, "limit": 10},
            "fields": ["id", "name"]
        });
        let req: ListReq = serde_json::from_value(raw).unwrap();
        assert!(req.validate(&expr_opt(), None).is_ok());
        assert_eq!(req.fields, vec!["id", "name"]);
    }

    #[test]
    fn filter_and_page_required() {
        let missing_filter = ListOption {
            page: Some(BasePage::default_page()),
            ..ListOption::default()
        };
        let err = missing_filter.validate(&expr_opt(), None).unwrap_err();
        assert_eq!(err.to_string(), "filter is required");

        let missing_page = ListOption {
            filter: Some(Expression::all()),
            ..ListOption::default()
        };
        let err = missing_page.validate(&expr_opt(), None).unwrap_err();
        assert_eq!(err.to_string(), "page is required");
    }

    #[test]
    fn sort_and_fields_must_be_allowed() {
        let page = BasePage::new(0, 10).with_sort("secret", Order::Asc);
        let opt = ListOption::new(Expression::all(), page);
        assert!(opt.validate(&expr_opt(), None).is_err());

        let opt = ListOption::new(Expression::all(), BasePage::new(0, 10)).with_fields(["id", "secret"]);
        assert!(opt.validate(&expr_opt(), None).is_err());

        let opt = ListOption::new(Expression::all(), BasePage::new(0, 10).with_sort("name", Order::Desc));
        assert!(opt.validate(&expr_opt(), None).is_ok());
    }

    #[test]
    fn json_keys_are_not_sortable_or_projectable() {
        let keyed = ExprOption::new([
            ("id", ColumnType::String),
            ("extension.*", ColumnType::Json),
        ]);
        let filter = Expression::and([AtomRule::eq("extension.vpc_id", "vpc-1")]);

        let page = BasePage::new(0, 10).with_sort("extension.vpc_id", Order::Asc);
        let err = ListOption::new(filter.clone(), page).validate(&keyed, None).unwrap_err();
        assert!(err.to_string().contains("page.sort: extension.vpc_id"));

        let opt = ListOption::new(filter.clone(), BasePage::new(0, 10)).with_fields(["id", "extension.vpc_id"]);
        let err = opt.validate(&keyed, None).unwrap_err();
        assert!(err.to_string().contains("field: extension.vpc_id"));

        assert!(ListOption::new(filter, BasePage::new(0, 10)).validate(&keyed, None).is_ok());
    }

    #[test]
    fn batch_delete_requires_filter() {
        assert!(BatchDeleteReq::default().validate(&expr_opt()).is_err());
        assert!(BatchDeleteReq::new(Expression::all()).validate(&expr_opt()).is_err());
        let req = BatchDeleteReq::new(Expression::and([AtomRule::eq("vendor", "aws")]));
        assert!(req.validate(&expr_opt()).is_ok());
    }

    #[test]
    fn batch_delete_by_ids() {
        assert!(BatchDeleteByIdReq::default().validate().is_err());
        let req = BatchDeleteByIdReq {
            ids: vec!["1".into(), "2".into()],
        };
        assert!(req.validate().is_ok());
        assert_eq!(req.to_filter(), Expression::in_ids(["1", "2"]));

        let too_many = BatchDeleteByIdReq {
            ids: (0..=MAX_BATCH_DELETE_IDS).map(|i| i.to_string()).collect(),
        };
        assert!(too_many.validate().is_err());
    }

    #[test]
    fn list_result_wire_shape() {
        let result = ListResult::details(vec![json!({"id": "7"})]);
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"count": 0, "details": [{"id": "7"}]})
        );
        let counted: ListResult<()> = ListResult::count(3);
        assert_eq!(serde_json::to_value(&counted).unwrap(), json!({"count": 3, "details": []}));
    }
}
