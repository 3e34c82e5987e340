use std::collections::HashMap;
use std::path::Path;

use super::value::ConfigValue;
use super::ConfigError;

/// Read a YAML file into `values`; a missing file is not an error.
pub(crate) fn load_yaml_file(
    path: &Path,
    values: &mut HashMap<String, ConfigValue>,
) -> Result<(), ConfigError> {
    if !path.exists() {
        return Ok(());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Load(format!("read {}: {e}", path.display())))?;
    load_yaml_str(&content, values)
}

pub(crate) fn load_yaml_str(
    content: &str,
    values: &mut HashMap<String, ConfigValue>,
) -> Result<(), ConfigError> {
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|e| ConfigError::Load(e.to_string()))?;
    flatten_yaml("", &yaml, values);
    Ok(())
}

/// Flatten nested mappings into dot-separated keys (`hcm.database.url`).
/// Sequences are stored whole under their parent key.
fn flatten_yaml(prefix: &str, value: &serde_yaml::Value, out: &mut HashMap<String, ConfigValue>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    other => format!("{other:?}"),
                };
                let full_key = if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_yaml(&full_key, v, out);
            }
        }
        leaf if !prefix.is_empty() => {
            out.insert(prefix.to_string(), ConfigValue::from_yaml(leaf));
        }
        _ => {}
    }
}

/// Overlay environment variables that start with `prefix` (e.g. `HCM_`).
///
/// `HCM_DATABASE_MAX_CONNECTIONS` overrides `hcm.database.max_connections`
/// when that key is already known; unknown variables map every `_` to `.`.
pub(crate) fn overlay_env<I>(prefix: &str, vars: I, values: &mut HashMap<String, ConfigValue>)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (env_key, env_val) in vars {
        if !env_key.starts_with(prefix) {
            continue;
        }
        let lowered = env_key.to_ascii_lowercase();
        let known = values
            .keys()
            .find(|k| k.replace('.', "_") == lowered)
            .cloned();
        let key = known.unwrap_or_else(|| lowered.replace('_', "."));
        values.insert(key, ConfigValue::String(env_val));
    }
}
