//! Feature indexing by ID and the ordered ID union used by the merge loop.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde_json::Value;
use tracing::warn;

use crate::models::{Feature, Properties};
use crate::normalize::{js_string, normalize_properties};

/// A feature identity. A string `"1"` and a number `1` are distinct IDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeatureId {
    Text(String),
    /// Numeric IDs keep their JavaScript string rendering.
    Number(String),
}

impl FeatureId {
    /// Only strings and numbers identify a feature.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(FeatureId::Text(s.clone())),
            Value::Number(_) => Some(FeatureId::Number(js_string(value))),
            _ => None,
        }
    }

    /// JSON value to emit when no source supplies one.
    pub fn to_value(&self) -> Value {
        match self {
            FeatureId::Text(s) => Value::String(s.clone()),
            FeatureId::Number(s) => {
                if let Ok(i) = s.parse::<i64>() {
                    Value::from(i)
                } else if let Ok(u) = s.parse::<u64>() {
                    Value::from(u)
                } else {
                    s.parse::<f64>()
                        .ok()
                        .and_then(serde_json::Number::from_f64)
                        .map(Value::Number)
                        .unwrap_or_else(|| Value::String(s.clone()))
                }
            }
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FeatureId::Text(s) | FeatureId::Number(s) => s,
        }
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source feature together with its lowercase-keyed properties.
#[derive(Debug, Clone)]
pub struct IndexedFeature<'a> {
    pub feature: &'a Feature,
    pub properties: Properties,
}

/// ID → feature index over one collection, preserving first-seen ID order.
#[derive(Debug, Default)]
pub struct FeatureIndex<'a> {
    order: Vec<FeatureId>,
    entries: HashMap<FeatureId, IndexedFeature<'a>>,
}

impl<'a> FeatureIndex<'a> {
    /// Index `features` by the value at `id_key` (lowercase).
    ///
    /// Features without a string or numeric ID are skipped. On duplicates the
    /// later feature wins while the ID keeps its first position.
    pub fn build(features: &'a [Feature], id_key: &str) -> Self {
        let mut index = Self::default();
        for feature in features {
            let properties = normalize_properties(feature.properties.as_ref());
            let Some(id) = properties.get(id_key).and_then(FeatureId::from_value) else {
                continue;
            };
            let entry = IndexedFeature {
                feature,
                properties,
            };
            if index.entries.insert(id.clone(), entry).is_some() {
                warn!(id = %id, key = id_key, "duplicate feature ID, keeping the later feature");
            } else {
                index.order.push(id);
            }
        }
        index
    }

    pub fn get(&self, id: &FeatureId) -> Option<&IndexedFeature<'a>> {
        self.entries.get(id)
    }

    pub fn ids(&self) -> &[FeatureId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// IDs of `a` in order, then IDs only present in `b`, in `b`'s order.
pub fn union_ids(a: &FeatureIndex<'_>, b: &FeatureIndex<'_>) -> Vec<FeatureId> {
    let mut seen: HashSet<&FeatureId> = HashSet::with_capacity(a.len() + b.len());
    let mut ids = Vec::with_capacity(a.len() + b.len());
    for id in a.ids().iter().chain(b.ids()) {
        if seen.insert(id) {
            ids.push(id.clone());
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn features(value: Value) -> Vec<Feature> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_feature_id_kinds() {
        assert_eq!(
            FeatureId::from_value(&json!("1")),
            Some(FeatureId::Text("1".into()))
        );
        assert_eq!(
            FeatureId::from_value(&json!(1)),
            Some(FeatureId::Number("1".into()))
        );
        assert_ne!(
            FeatureId::from_value(&json!("1")),
            FeatureId::from_value(&json!(1))
        );
        assert_eq!(FeatureId::from_value(&json!(null)), None);
        assert_eq!(FeatureId::from_value(&json!(true)), None);

        assert_eq!(FeatureId::Number("42".into()).to_value(), json!(42));
        assert_eq!(FeatureId::Number("1.5".into()).to_value(), json!(1.5));
        assert_eq!(FeatureId::Text("FRA".into()).to_value(), json!("FRA"));
    }

    #[test]
    fn test_index_uses_lowercase_key_and_skips_invalid() {
        let fs = features(json!([
            { "type": "Feature", "geometry": null, "properties": { "ISO_A3": "FRA" } },
            { "type": "Feature", "geometry": null, "properties": { "iso_a3": null } },
            { "type": "Feature", "geometry": null, "properties": null },
            { "type": "Feature", "geometry": null, "properties": { "iso_a3": 250 } }
        ]));
        let index = FeatureIndex::build(&fs, "iso_a3");

        assert_eq!(
            index.ids(),
            &[
                FeatureId::Text("FRA".into()),
                FeatureId::Number("250".into())
            ]
        );
        let fra = index.get(&FeatureId::Text("FRA".into())).unwrap();
        assert_eq!(fra.properties.get("iso_a3"), Some(&json!("FRA")));
    }

    #[test]
    fn test_duplicate_ids_later_wins_first_position() {
        let fs = features(json!([
            { "type": "Feature", "geometry": null, "properties": { "id": "A", "v": 1 } },
            { "type": "Feature", "geometry": null, "properties": { "id": "B", "v": 2 } },
            { "type": "Feature", "geometry": null, "properties": { "id": "A", "v": 3 } }
        ]));
        let index = FeatureIndex::build(&fs, "id");

        assert_eq!(
            index.ids(),
            &[FeatureId::Text("A".into()), FeatureId::Text("B".into())]
        );
        let a = index.get(&FeatureId::Text("A".into())).unwrap();
        assert_eq!(a.properties.get("v"), Some(&json!(3)));
    }

    #[test]
    fn test_union_order() {
        let fa = features(json!([
            { "type": "Feature", "geometry": null, "properties": { "id": "C" } },
            { "type": "Feature", "geometry": null, "properties": { "id": "A" } }
        ]));
        let fb = features(json!([
            { "type": "Feature", "geometry": null, "properties": { "id": "B" } },
            { "type": "Feature", "geometry": null, "properties": { "id": "A" } },
            { "type": "Feature", "geometry": null, "properties": { "id": "D" } }
        ]));
        let a = FeatureIndex::build(&fa, "id");
        let b = FeatureIndex::build(&fb, "id");

        let ids: Vec<String> = union_ids(&a, &b).iter().map(ToString::to_string).collect();
        assert_eq!(ids, vec!["C", "A", "B", "D"]);
    }
}
