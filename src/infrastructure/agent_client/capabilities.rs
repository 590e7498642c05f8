use serde_json::Value;

use crate::domain::models::AgentCapabilities;

/// Parses an agent's raw capability payload. Per spec.md §4.1, a malformed
/// payload yields an empty record rather than an error — the caller always
/// has *something* to filter on, just nothing matches.
#[must_use]
pub fn parse_capabilities(raw: &Value) -> AgentCapabilities {
    let Some(obj) = raw.as_object() else {
        return AgentCapabilities::default();
    };

    let providers = obj
        .get("providers")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let max_concurrent_jobs = obj
        .get("max_concurrent_jobs")
        .and_then(Value::as_u64)
        .map(|n| n as u32);

    let features = obj
        .get("features")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    AgentCapabilities {
        providers,
        max_concurrent_jobs,
        features,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_well_formed_payload() {
        let raw = json!({
            "providers": ["containerlab", "libvirt"],
            "max_concurrent_jobs": 8,
            "features": ["overlay"]
        });
        let caps = parse_capabilities(&raw);
        assert_eq!(caps.providers, vec!["containerlab", "libvirt"]);
        assert_eq!(caps.max_concurrent_jobs(), 8);
        assert_eq!(caps.features, vec!["overlay"]);
    }

    #[test]
    fn malformed_payload_yields_empty_record() {
        let raw = json!("not an object");
        let caps = parse_capabilities(&raw);
        assert!(caps.providers.is_empty());
        assert_eq!(caps.max_concurrent_jobs(), 4);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let raw = json!({});
        let caps = parse_capabilities(&raw);
        assert_eq!(caps.max_concurrent_jobs(), 4);
        assert!(caps.features.is_empty());
    }
}
