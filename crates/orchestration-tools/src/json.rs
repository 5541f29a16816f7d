//! JSON load/save helpers, tolerant of unknown fields.

use crate::error::{Error, Result};
use crate::fs;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

fn json_err(path: impl AsRef<Path>) -> impl FnOnce(serde_json::Error) -> Error {
    let path = path.as_ref().display().to_string();
    move |source| Error::Json { path, source }
}

/// Deserialize `T` from the JSON document at `path`.
///
/// Unknown fields are ignored (the default for `#[derive(Deserialize)]`
/// without `deny_unknown_fields`); a malformed document surfaces as an
/// `Error::Json` rather than a panic, matching the "exceptions become
/// `Result::Err`" contract.
pub fn json_to_object<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let text = fs::read_file(&path)?;
    serde_json::from_str(&text).map_err(json_err(&path))
}

/// Serialize `obj` as pretty JSON and write it to `path` via the
/// atomic-replace invariant.
pub fn object_to_json<T: Serialize>(obj: &T, path: impl AsRef<Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(obj).map_err(json_err(&path))?;
    fs::write_file(&text, path, false)
}

/// Load a `HashMap<String, T>` from a JSON document, used for the package
/// map and similar keyed collections.
pub fn load_map_from_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<HashMap<String, T>> {
    json_to_object(path)
}

/// Persist a `HashMap<String, T>` as a JSON document.
pub fn map_to_json_file<T: Serialize>(
    map: &HashMap<String, T>,
    path: impl AsRef<Path>,
) -> Result<()> {
    object_to_json(map, path)
}

/// Split a top-level JSON object whose keys are policy-namespaces into a
/// mapping from key to the serialized sub-document, optionally suffixing
/// each key with a `(tenant, profile)` tag (`<key>_tenant_<t>_profile_<p>`).
pub fn json_object_splitter(
    json: &str,
    tenant_id: Option<&str>,
    profile_id: Option<&str>,
) -> Result<HashMap<String, String>> {
    let value: serde_json::Value = serde_json::from_str(json).map_err(json_err("<in-memory>"))?;
    let object = value
        .as_object()
        .ok_or_else(|| Error::NotAnObject(json.to_string()))?;

    let mut out = HashMap::with_capacity(object.len());
    for (key, sub_value) in object {
        let serialized = serde_json::to_string(sub_value).map_err(json_err("<in-memory>"))?;
        let tagged_key = match (tenant_id, profile_id) {
            (Some(t), Some(p)) if !t.is_empty() || !p.is_empty() => {
                format!("{key}_tenant_{t}_profile_{p}")
            }
            _ => key.clone(),
        };
        out.insert(tagged_key, serialized);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trips_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("m.json");
        let mut map = HashMap::new();
        map.insert("a".to_string(), 1u32);
        map_to_json_file(&map, &path).unwrap();
        let loaded: HashMap<String, u32> = load_map_from_json(&path).unwrap();
        assert_eq!(loaded, map);
    }

    #[test]
    fn splitter_tags_keys_for_tenant() {
        let json = r#"{"antibot":{"x":1},"waap":{"y":2}}"#;
        let split = json_object_splitter(json, Some("t1"), Some("p1")).unwrap();
        assert!(split.contains_key("antibot_tenant_t1_profile_p1"));
        assert!(split.contains_key("waap_tenant_t1_profile_p1"));
    }

    #[test]
    fn splitter_leaves_keys_untagged_without_tenant() {
        let json = r#"{"antibot":{"x":1}}"#;
        let split = json_object_splitter(json, None, None).unwrap();
        assert!(split.contains_key("antibot"));
    }

    #[test]
    fn splitter_rejects_non_object() {
        assert!(json_object_splitter("[1,2,3]", None, None).is_err());
    }
}
