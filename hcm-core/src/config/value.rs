use std::time::Duration;

use super::ConfigError;

/// A leaf value from a YAML file or the environment.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
    List(Vec<ConfigValue>),
}

impl ConfigValue {
    pub(crate) fn from_yaml(value: &serde_yaml::Value) -> Self {
        match value {
            serde_yaml::Value::Null => ConfigValue::Null,
            serde_yaml::Value::Bool(b) => ConfigValue::Bool(*b),
            serde_yaml::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => ConfigValue::Integer(i),
                (None, Some(f)) => ConfigValue::Float(f),
                _ => ConfigValue::String(n.to_string()),
            },
            serde_yaml::Value::String(s) => ConfigValue::String(s.clone()),
            serde_yaml::Value::Sequence(seq) => {
                ConfigValue::List(seq.iter().map(ConfigValue::from_yaml).collect())
            }
            other => ConfigValue::String(format!("{other:?}")),
        }
    }
}

/// Conversion from a raw [`ConfigValue`] into a typed setting.
pub trait FromConfigValue: Sized {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError>;
}

fn mismatch(key: &str, expected: &'static str) -> ConfigError {
    ConfigError::TypeMismatch {
        key: key.to_string(),
        expected,
    }
}

impl FromConfigValue for String {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        match value {
            ConfigValue::String(s) => Ok(s.clone()),
            ConfigValue::Integer(i) => Ok(i.to_string()),
            ConfigValue::Float(f) => Ok(f.to_string()),
            ConfigValue::Bool(b) => Ok(b.to_string()),
            ConfigValue::Null | ConfigValue::List(_) => Err(mismatch(key, "String")),
        }
    }
}

impl FromConfigValue for bool {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        match value {
            ConfigValue::Bool(b) => Ok(*b),
            ConfigValue::String(s) => match s.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                _ => Err(mismatch(key, "bool")),
            },
            _ => Err(mismatch(key, "bool")),
        }
    }
}

impl FromConfigValue for i64 {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        match value {
            ConfigValue::Integer(i) => Ok(*i),
            ConfigValue::String(s) => s.trim().parse().map_err(|_| mismatch(key, "i64")),
            _ => Err(mismatch(key, "i64")),
        }
    }
}

impl FromConfigValue for f64 {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        match value {
            ConfigValue::Float(f) => Ok(*f),
            ConfigValue::Integer(i) => Ok(*i as f64),
            ConfigValue::String(s) => s.trim().parse().map_err(|_| mismatch(key, "f64")),
            _ => Err(mismatch(key, "f64")),
        }
    }
}

macro_rules! impl_from_config_unsigned {
    ($($ty:ty),+) => {
        $(
            impl FromConfigValue for $ty {
                fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
                    let i = i64::from_config_value(value, key)?;
                    <$ty>::try_from(i).map_err(|_| mismatch(key, stringify!($ty)))
                }
            }
        )+
    };
}

impl_from_config_unsigned!(u32, u64, usize);

/// Durations are written as an integer number of milliseconds or with a
/// unit suffix: `"50ms"`, `"3s"`, `"2m"`.
impl FromConfigValue for Duration {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        match value {
            ConfigValue::Integer(ms) if *ms >= 0 => Ok(Duration::from_millis(*ms as u64)),
            ConfigValue::String(s) => parse_duration(s.trim()).ok_or_else(|| mismatch(key, "Duration")),
            _ => Err(mismatch(key, "Duration")),
        }
    }
}

fn parse_duration(s: &str) -> Option<Duration> {
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (num, unit) = s.split_at(split);
    let n: u64 = num.parse().ok()?;
    match unit {
        "" | "ms" => Some(Duration::from_millis(n)),
        "s" => Some(Duration::from_secs(n)),
        "m" => Some(Duration::from_secs(n * 60)),
        _ => None,
    }
}

impl<T: FromConfigValue> FromConfigValue for Option<T> {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        match value {
            ConfigValue::Null => Ok(None),
            v => T::from_config_value(v, key).map(Some),
        }
    }
}

impl<T: FromConfigValue> FromConfigValue for Vec<T> {
    fn from_config_value(value: &ConfigValue, key: &str) -> Result<Self, ConfigError> {
        match value {
            ConfigValue::List(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| T::from_config_value(v, &format!("{key}[{i}]")))
                .collect(),
            // comma separated, the shape environment variables arrive in
            ConfigValue::String(s) => s
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| T::from_config_value(&ConfigValue::String(part.to_string()), key))
                .collect(),
            _ => Err(mismatch(key, "list")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_forms() {
        let d = |v: ConfigValue| Duration::from_config_value(&v, "k");
        assert_eq!(d(ConfigValue::Integer(50)).unwrap(), Duration::from_millis(50));
        assert_eq!(d(ConfigValue::String("50ms".into())).unwrap(), Duration::from_millis(50));
        assert_eq!(d(ConfigValue::String("3s".into())).unwrap(), Duration::from_secs(3));
        assert_eq!(d(ConfigValue::String("2m".into())).unwrap(), Duration::from_secs(120));
        assert!(d(ConfigValue::String("3h".into())).is_err());
        assert!(d(ConfigValue::Integer(-1)).is_err());
    }

    #[test]
    fn vec_from_comma_separated_string() {
        let v: Vec<String> =
            FromConfigValue::from_config_value(&ConfigValue::String("id, name,,vendor".into()), "k")
                .unwrap();
        assert_eq!(v, vec!["id", "name", "vendor"]);
    }

    #[test]
    fn unsigned_rejects_negative() {
        assert!(u32::from_config_value(&ConfigValue::Integer(-3), "k").is_err());
        assert_eq!(u32::from_config_value(&ConfigValue::String("7".into()), "k").unwrap(), 7);
    }
}
