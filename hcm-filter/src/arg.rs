use serde_json::Value;

/// A value bound to a placeholder. Values never appear in SQL text.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlArg {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl SqlArg {
    /// Convert a basic JSON value; arrays and objects are bound as JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => SqlArg::Null,
            Value::Bool(b) => SqlArg::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => SqlArg::Int(i),
                None => SqlArg::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => SqlArg::Text(s.clone()),
            other => SqlArg::Text(other.to_string()),
        }
    }

    /// Text rendition, used where the database compares against extracted JSON text.
    pub fn into_text(self) -> Self {
        match self {
            SqlArg::Bool(b) => SqlArg::Text(b.to_string()),
            SqlArg::Int(i) => SqlArg::Text(i.to_string()),
            SqlArg::Float(f) => SqlArg::Text(f.to_string()),
            other => other,
        }
    }
}

impl From<&str> for SqlArg {
    fn from(v: &str) -> Self {
        SqlArg::Text(v.to_string())
    }
}

impl From<String> for SqlArg {
    fn from(v: String) -> Self {
        SqlArg::Text(v)
    }
}

impl From<i64> for SqlArg {
    fn from(v: i64) -> Self {
        SqlArg::Int(v)
    }
}

impl From<u32> for SqlArg {
    fn from(v: u32) -> Self {
        SqlArg::Int(i64::from(v))
    }
}

impl From<bool> for SqlArg {
    fn from(v: bool) -> Self {
        SqlArg::Bool(v)
    }
}

impl From<f64> for SqlArg {
    fn from(v: f64) -> Self {
        SqlArg::Float(v)
    }
}

impl<T: Into<SqlArg>> From<Option<T>> for SqlArg {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlArg::Null)
    }
}

impl From<&Value> for SqlArg {
    fn from(v: &Value) -> Self {
        SqlArg::from_json(v)
    }
}
