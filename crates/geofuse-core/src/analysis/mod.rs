//! Dataset analysis: key detection, classification and statistics.

pub mod classify;
pub mod keys;

use tracing::debug;

use crate::models::{AnalysisResult, FeatureCollection, Properties};
use crate::normalize::{normalize_properties, trimmed_str};
use crate::precision::max_decimal_places;

pub use classify::{CountryRegistry, classify};
pub use keys::{PropertyStats, language_code};

/// Summarize one dataset. Never fails and never touches `collection`.
pub fn analyze(file_name: &str, collection: &FeatureCollection) -> AnalysisResult {
    let num_features = collection.features.len();
    let mut stats = PropertyStats::new();
    let mut coordinate_count = 0;
    let mut max_precision = 0;

    let normalized: Vec<Properties> = collection
        .features
        .iter()
        .map(|feature| {
            if let Some(geometry) = &feature.geometry {
                coordinate_count += geometry.coordinate_count();
                max_precision = max_precision.max(max_decimal_places(geometry));
            }
            let props = normalize_properties(feature.properties.as_ref());
            stats.observe(&props);
            props
        })
        .collect();

    let first = normalized.first();
    let name_key = keys::select_name_property(&stats, first, num_features);
    let sovereignty_key = keys::select_sovereignty_property(&stats, first, name_key.as_deref());

    let mut registry = CountryRegistry::new();
    if let Some(name_key) = &name_key {
        for props in &normalized {
            let Some(name) = trimmed_str(props.get(name_key)) else {
                continue;
            };
            let sovereign = sovereignty_key
                .as_deref()
                .and_then(|key| trimmed_str(props.get(key)));
            if let Some(detail) = classify(name, sovereign) {
                registry.insert(detail);
            }
        }
    }

    debug!(
        file = file_name,
        features = num_features,
        name_key = ?name_key,
        sovereignty_key = ?sovereignty_key,
        countries = registry.len(),
        "analyzed dataset"
    );

    AnalysisResult {
        file_name: file_name.to_string(),
        num_features,
        languages: stats.languages(),
        geometry_precision_score: coordinate_count,
        max_coordinate_precision: max_precision,
        common_properties: stats.sorted_keys(),
        potential_id_keys: keys::potential_id_keys(&stats, num_features),
        country_name_property: name_key,
        sovereignty_property_key: sovereignty_key,
        country_details: registry.into_sorted(),
    }
}
