//! Defaults derived from the analyses of both sources.
//!
//! Each function is pure: it takes the current state and returns the value the
//! caller should adopt.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::merge::is_structural_key;
use crate::models::{
    AnalysisResult, CountrySelection, CountrySelections, EntityClass, MergeConfig,
    OtherPropertiesPreference, is_valid_id_property,
};

/// ID-like keys offered for manual translation editing, in display order.
pub const EDITABLE_ID_KEYS: &[&str] = &["iso_a3", "sov_a3", "adm0_a3"];

const PREFERRED_COMMON_ID_KEYS: &[&str] = &["iso_a3", "admin", "id"];

/// The ID property to match features on, lowercased.
///
/// With both analyses present, a key that is a potential ID in both wins; the
/// current value is kept while it stays valid. With neither, `default_id` is
/// used. With only one, `current` is kept.
pub fn default_id_property(
    analysis_a: Option<&AnalysisResult>,
    analysis_b: Option<&AnalysisResult>,
    current: &str,
    default_id: &str,
) -> String {
    let current = current.to_lowercase();
    let (a, b) = match (analysis_a, analysis_b) {
        (Some(a), Some(b)) => (a, b),
        (None, None) => return default_id.to_lowercase(),
        _ => return current,
    };

    let potential_a = &a.potential_id_keys;
    let potential_b = &b.potential_id_keys;
    let common: Vec<&String> = potential_a
        .iter()
        .filter(|key| potential_b.contains(key))
        .collect();
    let lacks = |keys: &[String]| current.is_empty() || !keys.iter().any(|k| *k == current);

    let chosen = if !common.is_empty() {
        if current.is_empty() || !common.iter().any(|k| **k == current) {
            PREFERRED_COMMON_ID_KEYS
                .iter()
                .find_map(|preferred| common.iter().find(|k| **k == preferred))
                .or(common.first())
                .map(|k| k.to_string())
        } else {
            None
        }
    } else if !potential_a.is_empty() && lacks(potential_a) {
        potential_a.first().cloned()
    } else if !potential_b.is_empty() && lacks(potential_b) {
        potential_b.first().cloned()
    } else {
        None
    };

    chosen.map(|k| k.to_lowercase()).unwrap_or(current)
}

/// Keys that identify or name a feature and are never offered as "other" properties.
fn core_id_keys(
    config: &MergeConfig,
    analysis_a: Option<&AnalysisResult>,
    analysis_b: Option<&AnalysisResult>,
) -> HashSet<String> {
    let mut keys = HashSet::new();
    if !config.id_property.is_empty() {
        keys.insert(config.id_key());
    }
    for analysis in [analysis_a, analysis_b].into_iter().flatten() {
        keys.extend(analysis.country_name_property.iter().map(|k| k.to_lowercase()));
        keys.extend(analysis.sovereignty_property_key.iter().map(|k| k.to_lowercase()));
    }
    keys
}

/// Allow-list for one class: every offered key, keeping explicit `false`s.
pub fn default_selected_properties(
    config: &MergeConfig,
    class: EntityClass,
    analysis_a: Option<&AnalysisResult>,
    analysis_b: Option<&AnalysisResult>,
) -> BTreeMap<String, bool> {
    let preference = config.other_properties_source.get(class);
    if preference.primary.is_discard() {
        return BTreeMap::new();
    }

    let (primary, secondary) = preference.primary.order(analysis_a, analysis_b);
    let mut offered: Vec<&String> = Vec::new();
    offered.extend(primary.into_iter().flat_map(|a| a.common_properties.iter()));
    if preference.additive {
        offered.extend(secondary.into_iter().flat_map(|a| a.common_properties.iter()));
    }

    let core = core_id_keys(config, analysis_a, analysis_b);
    offered
        .into_iter()
        .filter(|key| !is_structural_key(key) && !core.contains(key.as_str()))
        .map(|key| {
            let keep = preference.selected_properties.get(key) != Some(&false);
            (key.clone(), keep)
        })
        .collect()
}

/// `config` with both allow-lists recomputed by [`default_selected_properties`].
pub fn with_default_selected_properties(
    config: &MergeConfig,
    analysis_a: Option<&AnalysisResult>,
    analysis_b: Option<&AnalysisResult>,
) -> MergeConfig {
    let mut next = config.clone();
    for class in EntityClass::ALL {
        let selected = default_selected_properties(config, class, analysis_a, analysis_b);
        let preference = OtherPropertiesPreference {
            selected_properties: selected,
            ..config.other_properties_source.get(class).clone()
        };
        next.other_properties_source = next.other_properties_source.with(class, preference);
    }
    next
}

/// Keys a user may type manual translations for.
///
/// ID keys come first in fixed order, then the name keys, then the rest
/// alphabetically.
pub fn manual_translation_keys(
    analysis_a: Option<&AnalysisResult>,
    analysis_b: Option<&AnalysisResult>,
) -> Vec<String> {
    let mut keys = BTreeSet::new();
    let mut name_keys = HashSet::new();
    for analysis in [analysis_a, analysis_b].into_iter().flatten() {
        keys.extend(
            analysis
                .common_properties
                .iter()
                .filter(|key| is_structural_key(key) || EDITABLE_ID_KEYS.contains(&key.as_str()))
                .cloned(),
        );
        if let Some(name_key) = &analysis.country_name_property {
            keys.insert(name_key.clone());
            name_keys.insert(name_key.clone());
        }
    }

    let rank = |key: &str| match EDITABLE_ID_KEYS.iter().position(|k| *k == key) {
        Some(position) => (0, position),
        None if name_keys.contains(key) => (1, 0),
        None => (2, 0),
    };
    let mut keys: Vec<String> = keys.into_iter().collect();
    keys.sort_by(|a, b| {
        rank(a.as_str())
            .cmp(&rank(b.as_str()))
            .then_with(|| a.cmp(b))
    });
    keys
}

/// Selections with stale names dropped and one-sided entities pinned to their source.
pub fn default_country_selections(
    previous: &CountrySelections,
    analysis_a: &AnalysisResult,
    analysis_b: &AnalysisResult,
) -> CountrySelections {
    let in_a: HashSet<&str> = analysis_a.country_details.iter().map(|d| d.name.as_str()).collect();
    let in_b: HashSet<&str> = analysis_b.country_details.iter().map(|d| d.name.as_str()).collect();

    let mut selections: CountrySelections = previous
        .iter()
        .filter(|(name, _)| in_a.contains(name.as_str()) || in_b.contains(name.as_str()))
        .map(|(name, choice)| (name.clone(), *choice))
        .collect();

    for name in in_a.union(&in_b) {
        if selections.contains_key(*name) {
            continue;
        }
        match (in_a.contains(name), in_b.contains(name)) {
            (true, false) => {
                selections.insert(name.to_string(), CountrySelection::A);
            }
            (false, true) => {
                selections.insert(name.to_string(), CountrySelection::B);
            }
            _ => {}
        }
    }
    selections
}

/// Whether the merge would emit anything beyond geometry and IDs.
pub fn is_any_property_selected(config: &MergeConfig) -> bool {
    let translations = &config.translations_source;
    let other = &config.other_properties_source;
    let other_selected = |pref: &OtherPropertiesPreference| {
        !pref.primary.is_discard() && pref.selected_properties.values().any(|v| *v)
    };

    !translations.recognized.primary.is_discard()
        || !translations.dependent.primary.is_discard()
        || other_selected(&other.recognized)
        || other_selected(&other.dependent)
}

/// Both sources analyzed and a usable ID property chosen.
pub fn can_configure_merge(
    config: &MergeConfig,
    analysis_a: Option<&AnalysisResult>,
    analysis_b: Option<&AnalysisResult>,
) -> bool {
    analysis_a.is_some() && analysis_b.is_some() && is_valid_id_property(&config.id_property)
}
