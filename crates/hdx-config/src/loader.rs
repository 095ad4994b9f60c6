use std::{fs, path::Path};

use hdx_utils::dict::merge_two_dictionaries;
use serde_json::{Map, Value};

use crate::error::{ConfigError, ErrorContext, Result};

fn into_mapping(value: Value, origin: &str) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(ConfigError::NotAMapping(origin.to_string())),
    }
}

/// Parses a YAML document into a JSON mapping. An empty document gives an
/// empty mapping.
pub fn load_yaml_str(content: &str, origin: &Path) -> Result<Map<String, Value>> {
    if content.trim().is_empty() {
        return Ok(Map::new());
    }
    let value: Value = serde_yaml::from_str(content).map_err(|err| {
        ConfigError::Yaml {
            path: origin.to_path_buf(),
            source: err,
        }
    })?;
    into_mapping(value, &origin.display().to_string())
}

pub fn load_yaml<P: AsRef<Path>>(path: P) -> Result<Map<String, Value>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading YAML file {}", path.display()))?;
    load_yaml_str(&content, path)
}

pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Map<String, Value>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading JSON file {}", path.display()))?;
    let value: Value = serde_json::from_str(&content).map_err(|err| {
        ConfigError::Json {
            path: path.to_path_buf(),
            source: err,
        }
    })?;
    into_mapping(value, &path.display().to_string())
}

/// Loads a YAML file and merges it into `existing`. If `path` does not exist
/// and ends in `.yaml`, the `.yml` spelling is tried.
pub fn load_yaml_into_existing<P: AsRef<Path>>(
    existing: &mut Map<String, Value>,
    path: P,
) -> Result<()> {
    let path = path.as_ref();
    let loaded = if !path.is_file() && path.extension().is_some_and(|ext| ext == "yaml") {
        load_yaml(path.with_extension("yml"))?
    } else {
        load_yaml(path)?
    };
    merge_two_dictionaries(existing, loaded)?;
    Ok(())
}

pub fn load_json_into_existing<P: AsRef<Path>>(
    existing: &mut Map<String, Value>,
    path: P,
) -> Result<()> {
    let loaded = load_json(path)?;
    merge_two_dictionaries(existing, loaded)?;
    Ok(())
}
