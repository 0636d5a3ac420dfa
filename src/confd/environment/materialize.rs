//! `materialise(searchPaths, app, profile) -> PropertySources`: a pure
//! function from search paths to an ordered property source list.
//!
//! Supports `.properties` (Java-style `key=value`, `#`/`!` comments) and
//! `.json` files.

use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{ConfdResult, ConfdResultExt};

use super::PropertySource;

const EXTENSIONS: [&str; 2] = ["properties", "json"];

/// Scans each search path, most specific first, for
/// `{application}-{profile}.{ext}` then `application-{profile}.{ext}`
/// then `{application}.{ext}` then `application.{ext}`, for each
/// supported extension. Every file found becomes one `PropertySource`;
/// none found is not an error -- an empty environment is valid.
pub fn materialise(
    search_paths: &[std::path::PathBuf],
    application: &str,
    profile: &str,
) -> ConfdResult<Vec<PropertySource>> {
    let profiles: Vec<&str> = profile.split(',').map(str::trim).filter(|p| !p.is_empty()).collect();
    let profiles = if profiles.is_empty() { vec!["default"] } else { profiles };

    let mut sources = Vec::new();
    for dir in search_paths {
        for profile in &profiles {
            for candidate in [format!("{application}-{profile}"), format!("application-{profile}")] {
                try_load(dir, &candidate, &mut sources)?;
            }
        }
        for candidate in [application.to_string(), "application".to_string()] {
            try_load(dir, &candidate, &mut sources)?;
        }
    }
    Ok(sources)
}

fn try_load(dir: &Path, stem: &str, sources: &mut Vec<PropertySource>) -> ConfdResult<()> {
    for ext in EXTENSIONS {
        let path = dir.join(format!("{stem}.{ext}"));
        if !path.is_file() {
            continue;
        }
        let contents = std::fs::read_to_string(&path)
            .chain_err(|| format!("failed to read property file `{}`", path.display()))?;
        let source = match ext {
            "json" => parse_json(&contents)
                .chain_err(|| format!("failed to parse `{}`", path.display()))?,
            _ => parse_properties(&contents),
        };
        sources.push(PropertySource {
            name: path.display().to_string(),
            source,
        });
    }
    Ok(())
}

fn parse_json(contents: &str) -> ConfdResult<Map<String, Value>> {
    match serde_json::from_str(contents)? {
        Value::Object(map) => Ok(map),
        other => Ok(flatten("", &other)),
    }
}

/// Java `.properties` syntax: `key=value` or `key: value`, one per
/// line, `#`/`!` starting a comment, blank lines ignored.
fn parse_properties(contents: &str) -> Map<String, Value> {
    let mut map = Map::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let split = line.find(['=', ':']);
        if let Some(idx) = split {
            let key = line[..idx].trim().to_string();
            let value = line[idx + 1..].trim().to_string();
            map.insert(key, Value::String(value));
        }
    }
    map
}

fn flatten(prefix: &str, value: &Value) -> Map<String, Value> {
    let mut map = Map::new();
    match value {
        Value::Object(obj) => {
            for (k, v) in obj {
                let key = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{prefix}.{k}")
                };
                map.extend(flatten(&key, v));
            }
        }
        other => {
            map.insert(prefix.to_string(), other.clone());
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn loads_properties_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("myapp.properties"), "a=1\nb.c=2\n").unwrap();
        let sources = materialise(&[dir.path().to_path_buf()], "myapp", "default").unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].source.get("a"), Some(&Value::String("1".into())));
    }

    #[test]
    fn loads_json_file_flattened() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("myapp.json"), r#"{"a":{"b":1}}"#).unwrap();
        let sources = materialise(&[dir.path().to_path_buf()], "myapp", "default").unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].source.get("a.b"), Some(&Value::Number(1.into())));
    }

    #[test]
    fn missing_files_yield_empty_not_error() {
        let dir = tempdir().unwrap();
        let sources = materialise(&[dir.path().to_path_buf()], "myapp", "default").unwrap();
        assert!(sources.is_empty());
    }
}
