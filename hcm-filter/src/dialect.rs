use crate::FilterError;

/// SQL flavour targeted by generated statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Generic SQL using `?` placeholders and MySQL JSON functions.
    #[default]
    Generic,
    /// SQLite `?` placeholders and JSON1 functions.
    Sqlite,
    /// MySQL `?` placeholders.
    MySql,
    /// Postgres `$1, $2, ...` placeholders and jsonb operators.
    Postgres,
}

impl Dialect {
    /// Placeholder for the 1-based bind position `index`.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Generic | Dialect::Sqlite | Dialect::MySql => "?".to_string(),
        }
    }

    /// Guess the dialect from a connection url scheme.
    pub fn from_url(url: &str) -> Self {
        match url.split(':').next().unwrap_or_default() {
            "sqlite" => Dialect::Sqlite,
            "mysql" | "mariadb" => Dialect::MySql,
            "postgres" | "postgresql" => Dialect::Postgres,
            _ => Dialect::Generic,
        }
    }
}

/// `name` or `qualifier.name`, each segment `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_identifier(ident: &str) -> bool {
    !ident.is_empty() && ident.split('.').all(is_valid_segment)
}

pub fn is_valid_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn check_identifier(ident: &str, kind: &'static str) -> Result<(), FilterError> {
    if is_valid_identifier(ident) {
        Ok(())
    } else {
        Err(FilterError::InvalidIdentifier {
            kind,
            ident: ident.to_string(),
        })
    }
}
