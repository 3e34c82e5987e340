use serde::{Deserialize, Deserializer, Serialize, Serializer};

use hcm_filter::is_valid_identifier;

use crate::DataError;

/// Page size ceiling when a call site does not set its own.
pub const DEFAULT_MAX_PAGE_LIMIT: u32 = 500;
/// Column ordered by when neither the caller nor the call site chose one.
pub const DEFAULT_SORT_FIELD: &str = "id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    pub const fn as_str(self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

impl std::fmt::Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `"ASC"`, `"DESC"`, or `""` / absent for no preference.
mod order_wire {
    use super::*;

    pub fn serialize<S: Serializer>(order: &Option<Order>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(order.map(Order::as_str).unwrap_or_default())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Order>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw.as_deref() {
            None | Some("") => Ok(None),
            Some("ASC") => Ok(Some(Order::Asc)),
            Some("DESC") => Ok(Some(Order::Desc)),
            Some(other) => Err(serde::de::Error::custom(format!(
                "page.order should be ASC or DESC, got {other}"
            ))),
        }
    }
}

/// Pagination request shared by every list endpoint.
///
/// Exactly one mode applies:
/// - count mode (`count: true`): only the number of matching rows is returned,
///   and `start`, `limit`, `sort`, `order` must all be unset;
/// - detail mode: rows `[start, start + limit)` in `sort`/`order` order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasePage {
    #[serde(default)]
    pub count: bool,
    #[serde(default)]
    pub start: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub sort: String,
    #[serde(default, with = "order_wire")]
    pub order: Option<Order>,
}

/// Per call-site page policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOption {
    /// Allow `start = limit = 0` to mean "every row".
    pub enable_unlimited_limit: bool,
    /// 0 falls back to [`DEFAULT_MAX_PAGE_LIMIT`].
    pub max_limit: u32,
    pub disabled_sort: bool,
}

impl Default for PageOption {
    fn default() -> Self {
        Self {
            enable_unlimited_limit: false,
            max_limit: DEFAULT_MAX_PAGE_LIMIT,
            disabled_sort: false,
        }
    }
}

impl PageOption {
    pub fn unlimited() -> Self {
        Self {
            enable_unlimited_limit: true,
            ..Self::default()
        }
    }

    fn effective_max(&self) -> u32 {
        if self.max_limit == 0 {
            DEFAULT_MAX_PAGE_LIMIT
        } else {
            self.max_limit
        }
    }
}

/// Call-site override of the caller's sort column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortOption {
    pub sort: String,
    /// Use `sort` only when the caller left `page.sort` empty.
    pub if_not_present: bool,
    /// Always use `sort`, whatever the caller asked for.
    pub force_overlap: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSqlOption {
    pub sort: SortOption,
}

impl Default for PageSqlOption {
    /// Sort by `id` unless the caller chose a column.
    fn default() -> Self {
        Self {
            sort: SortOption {
                sort: DEFAULT_SORT_FIELD.to_string(),
                if_not_present: true,
                force_overlap: false,
            },
        }
    }
}

impl PageSqlOption {
    pub fn force_sort(field: impl Into<String>) -> Self {
        Self {
            sort: SortOption {
                sort: field.into(),
                if_not_present: false,
                force_overlap: true,
            },
        }
    }
}

impl BasePage {
    /// First page of the default size, in detail mode.
    pub fn default_page() -> Self {
        Self {
            limit: DEFAULT_MAX_PAGE_LIMIT,
            ..Self::default()
        }
    }

    /// Count mode.
    pub fn count_page() -> Self {
        Self {
            count: true,
            ..Self::default()
        }
    }

    /// Every row; only valid where [`PageOption::enable_unlimited_limit`] is set.
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn new(start: u32, limit: u32) -> Self {
        Self {
            start,
            limit,
            ..Self::default()
        }
    }

    pub fn with_sort(mut self, sort: impl Into<String>, order: Order) -> Self {
        self.sort = sort.into();
        self.order = Some(order);
        self
    }

    /// Validate against the call-site policy; `None` means [`PageOption::default`].
    pub fn validate(&self, opt: Option<&PageOption>) -> Result<(), DataError> {
        let default_opt = PageOption::default();
        let opt = opt.unwrap_or(&default_opt);

        if self.count {
            if self.start > 0 {
                return Err(DataError::invalid("page.start is not allowed in count mode"));
            }
            if self.limit > 0 {
                return Err(DataError::invalid("page.limit is not allowed in count mode"));
            }
            if !self.sort.is_empty() {
                return Err(DataError::invalid("page.sort is not allowed in count mode"));
            }
            if self.order.is_some() {
                return Err(DataError::invalid("page.order is not allowed in count mode"));
            }
            return Ok(());
        }

        if opt.disabled_sort && (!self.sort.is_empty() || self.order.is_some()) {
            return Err(DataError::invalid(
                "page.sort and page.order are not supported by this resource",
            ));
        }

        if self.limit == 0 {
            if !opt.enable_unlimited_limit {
                return Err(DataError::invalid("page.limit is required"));
            }
            if self.start > 0 {
                return Err(DataError::invalid("page.start should be 0 when page.limit is 0"));
            }
        }

        let max = opt.effective_max();
        if self.limit > max {
            return Err(DataError::invalid(format!(
                "page.limit should be no more than {max}"
            )));
        }

        if !self.sort.is_empty() && !is_valid_identifier(&self.sort) {
            return Err(DataError::invalid(format!("page.sort: {} is invalid", self.sort)));
        }
        Ok(())
    }

    /// The `ORDER BY ... [LIMIT ... OFFSET ...]` suffix for detail mode.
    pub fn sql_expr(&self, opt: &PageSqlOption) -> Result<String, DataError> {
        page_sql_expr(self, opt)
    }
}

/// Build the ordering and windowing suffix for a detail-mode page.
///
/// The sort column is, in order of precedence: the option's column when it
/// forces overlap; the option's column when the caller left `sort` empty and
/// the option applies `if_not_present`; the caller's column; `id`.
/// The direction defaults to `ASC`. `start = limit = 0` omits the window.
pub fn page_sql_expr(page: &BasePage, opt: &PageSqlOption) -> Result<String, DataError> {
    if page.count {
        return Err(DataError::invalid("count page has no page sql expression"));
    }
    if page.limit == 0 && page.start > 0 {
        return Err(DataError::invalid("page.start should be 0 when page.limit is 0"));
    }

    let sort = &opt.sort;
    let column = if sort.force_overlap && !sort.sort.is_empty() {
        sort.sort.as_str()
    } else if sort.if_not_present && page.sort.is_empty() && !sort.sort.is_empty() {
        sort.sort.as_str()
    } else if !page.sort.is_empty() {
        page.sort.as_str()
    } else {
        DEFAULT_SORT_FIELD
    };
    if !is_valid_identifier(column) {
        return Err(DataError::invalid(format!("page.sort: {column} is invalid")));
    }
    let order = page.order.unwrap_or(Order::Asc);

    if page.start == 0 && page.limit == 0 {
        return Ok(format!("ORDER BY {column} {order}"));
    }
    Ok(format!(
        "ORDER BY {column} {order} LIMIT {} OFFSET {}",
        page.limit, page.start
    ))
}
