//! Encoding and validation of persisted selection payloads.
//!
//! Stored values and values received from other sessions go through the same
//! decoding path; anything absent or malformed falls back to defaults.

use std::collections::BTreeSet;

use crate::context::StorageError;
use crate::taxonomy::SubtypeKey;

/// Outcome of decoding a persisted category payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hydrated<T> {
    Stored(T),
    /// Absent or malformed; the caller applies the default selection
    Default,
}

pub fn encode_list<'a, I>(items: I) -> Result<String, StorageError>
where
    I: IntoIterator<Item = &'a str>,
{
    let items: Vec<&str> = items.into_iter().collect();
    serde_json::to_string(&items).map_err(StorageError::Encode)
}

pub fn decode_list(payload: &str) -> Result<Vec<String>, serde_json::Error> {
    serde_json::from_str(payload)
}

pub fn decode_categories(payload: Option<&str>) -> Hydrated<BTreeSet<String>> {
    let Some(payload) = payload else {
        return Hydrated::Default;
    };
    match decode_list(payload) {
        Ok(list) => Hydrated::Stored(list.into_iter().collect()),
        Err(e) => {
            tracing::warn!(error = %e, "Malformed category selection, using defaults");
            Hydrated::Default
        }
    }
}

/// Decode subtype keys, dropping entries that aren't valid composite keys.
/// Absent or malformed payloads decode to no subtypes.
pub fn decode_subtypes(payload: Option<&str>) -> BTreeSet<SubtypeKey> {
    let Some(payload) = payload else {
        return BTreeSet::new();
    };
    match decode_list(payload) {
        Ok(list) => {
            let total = list.len();
            let keys: BTreeSet<SubtypeKey> =
                list.iter().filter_map(|raw| SubtypeKey::parse(raw)).collect();
            if keys.len() < total {
                tracing::debug!(dropped = total - keys.len(), "Dropped invalid subtype keys");
            }
            keys
        }
        Err(e) => {
            tracing::warn!(error = %e, "Malformed subtype selection, clearing");
            BTreeSet::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_is_ordered_json_array() {
        let set: BTreeSet<String> = ["b", "a"].into_iter().map(String::from).collect();
        let payload = encode_list(set.iter().map(String::as_str)).unwrap();
        assert_eq!(payload, r#"["a","b"]"#);
    }

    #[test]
    fn missing_or_malformed_categories_fall_back() {
        assert_eq!(decode_categories(None), Hydrated::Default);
        assert_eq!(decode_categories(Some("not json")), Hydrated::Default);
        assert_eq!(decode_categories(Some(r#"{"a": 1}"#)), Hydrated::Default);
        assert_eq!(decode_categories(Some("[1, 2]")), Hydrated::Default);
    }

    #[test]
    fn stored_empty_list_is_not_default() {
        assert_eq!(decode_categories(Some("[]")), Hydrated::Stored(BTreeSet::new()));
    }

    #[test]
    fn subtype_decode_drops_invalid_keys() {
        let keys = decode_subtypes(Some(r#"["A::timeout", "garbage", "::x"]"#));
        assert_eq!(keys.len(), 1);
        assert!(keys.contains(&SubtypeKey::new("A", "timeout")));
        assert!(decode_subtypes(Some("{")).is_empty());
    }
}
