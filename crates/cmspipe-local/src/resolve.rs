//! Per-field resolution order: explicit override > AI result > rule-based fallback.

use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldSource {
    Override,
    Ai,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    pub field: &'static str,
    pub value: T,
    pub source: FieldSource,
}

/// The fallback closure only runs when neither an override nor an AI value exists.
pub fn resolve_field<T>(
    field: &'static str,
    overridden: Option<T>,
    ai: Option<T>,
    fallback: impl FnOnce() -> T,
) -> Resolved<T> {
    let (value, source) = match (overridden, ai) {
        (Some(v), _) => (v, FieldSource::Override),
        (None, Some(v)) => (v, FieldSource::Ai),
        (None, None) => (fallback(), FieldSource::Fallback),
    };
    tracing::debug!(field, source = ?source, "resolved field");
    Resolved {
        field,
        value,
        source,
    }
}

/// Where each field of a conversion came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Provenance(BTreeMap<&'static str, FieldSource>);

impl Provenance {
    pub fn record<T>(&mut self, resolved: Resolved<T>) -> T {
        self.0.insert(resolved.field, resolved.source);
        resolved.value
    }

    pub fn get(&self, field: &str) -> Option<FieldSource> {
        self.0.get(field).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, FieldSource)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_beats_ai_beats_fallback() {
        let r = resolve_field("x", Some(1), Some(2), || 3);
        assert_eq!((r.value, r.source), (1, FieldSource::Override));
        let r = resolve_field("x", None, Some(2), || 3);
        assert_eq!((r.value, r.source), (2, FieldSource::Ai));
        let r = resolve_field::<i32>("x", None, None, || 3);
        assert_eq!((r.value, r.source), (3, FieldSource::Fallback));
    }

    #[test]
    fn fallback_is_lazy() {
        let r = resolve_field("x", Some("a"), None, || panic!("fallback must not run"));
        assert_eq!(r.value, "a");
    }

    #[test]
    fn provenance_records_sources() {
        let mut p = Provenance::default();
        let v = p.record(resolve_field("slug", None, None, || "s".to_string()));
        assert_eq!(v, "s");
        assert_eq!(p.get("slug"), Some(FieldSource::Fallback));
        assert_eq!(p.get("category"), None);
        assert_eq!(
            serde_json::to_value(&p).unwrap(),
            serde_json::json!({"slug": "fallback"})
        );
    }
}
