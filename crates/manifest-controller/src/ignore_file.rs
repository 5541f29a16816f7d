//! The control-plane's "no content" encoding: a manifest document that is
//! nothing but `{"packages": null}`. Recognized independent of whitespace.

/// Whether `raw` parses as JSON and is, modulo whitespace, exactly
/// `{"packages": null}` — the fog's way of saying "nothing changed, don't
/// even diff".
pub fn is_ignore_file(raw: &str) -> bool {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value) => value == serde_json::json!({"packages": null}),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_compact_form() {
        assert!(is_ignore_file(r#"{"packages":null}"#));
    }

    #[test]
    fn recognizes_whitespace_variants() {
        assert!(is_ignore_file("{\n  \"packages\": null\n}\n"));
        assert!(is_ignore_file("  {\"packages\" : null}  "));
    }

    #[test]
    fn rejects_populated_manifest() {
        assert!(!is_ignore_file(r#"{"packages":{"svc":{}}}"#));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(!is_ignore_file("not json"));
    }
}
