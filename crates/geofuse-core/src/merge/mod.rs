//! Fusion of two feature collections under a [`MergeConfig`].

use std::collections::{BTreeSet, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::Result;
use crate::matcher::{FeatureId, FeatureIndex, IndexedFeature, union_ids};
use crate::models::{
    AnalysisResult, CountryDetail, CountrySelection, CountrySelections, EntityClass, Feature,
    FeatureCollection, ManualTranslations, MergeConfig, OtherPropertiesPreference, PrimarySource,
    Properties, TranslationPreference,
};
use crate::normalize::{is_present, is_truthy, js_string};
use crate::precision::round_geometry;


static STRUCTURAL_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(name|admin|official_name|country_name|sovereignt|cntry_name|cntrynam|name_long|formal_en)(_[a-z]{2,3})?$",
    )
    .unwrap()
});

static AUTOFILL_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(name|official_name|country_name|name_long|formal_en)(_[a-z]{2,3})?$")
        .unwrap()
});

const ENGLISH_NAME_KEYS: &[&str] = &["name_en", "name_eng"];

/// Whether `key` is a name/translation key (`name`, `admin_de`, `formal_en`, ...).
pub fn is_structural_key(key: &str) -> bool {
    STRUCTURAL_KEY.is_match(key)
}

/// Whether `key` may be backfilled with the definitive name in additive mode.
pub fn is_autofill_key(key: &str) -> bool {
    AUTOFILL_KEY.is_match(key)
}

/// Name of the fused collection.
pub fn output_name(a: &FeatureCollection, b: &FeatureCollection) -> String {
    format!(
        "Fused GeoJSON - {} & {}",
        a.display_name().unwrap_or("DatasetA"),
        b.display_name().unwrap_or("DatasetB")
    )
}

/// Fuse `a` and `b` into a new collection. Inputs are never modified.
///
/// Fails only on an unusable configuration (empty or sentinel ID property,
/// precision above 10). Features without identity or geometry are dropped.
pub fn merge(
    a: &FeatureCollection,
    b: &FeatureCollection,
    config: &MergeConfig,
    analysis_a: Option<&AnalysisResult>,
    analysis_b: Option<&AnalysisResult>,
    selections: &CountrySelections,
    manual: &ManualTranslations,
) -> Result<FeatureCollection> {
    config.validate()?;

    let ctx = MergeContext::new(config, analysis_a, analysis_b);
    let index_a = FeatureIndex::build(&a.features, &ctx.id_key);
    let index_b = FeatureIndex::build(&b.features, &ctx.id_key);
    let ids = union_ids(&index_a, &index_b);

    let mut features = Vec::with_capacity(ids.len());
    for id in &ids {
        if let Some(feature) =
            ctx.resolve(id, index_a.get(id), index_b.get(id), selections, manual)
        {
            features.push(feature);
        }
    }

    info!(
        id_property = %ctx.id_key,
        ids_a = index_a.len(),
        ids_b = index_b.len(),
        emitted = features.len(),
        dropped = ids.len() - features.len(),
        "merge complete"
    );

    Ok(FeatureCollection::new(output_name(a, b), features))
}

/// Per-call lookups shared by every ID.
struct MergeContext<'c> {
    config: &'c MergeConfig,
    id_key: String,
    name_key_a: Option<&'c str>,
    name_key_b: Option<&'c str>,
    details_a: HashMap<&'c str, &'c CountryDetail>,
    details_b: HashMap<&'c str, &'c CountryDetail>,
    /// ID key, name/sovereignty keys and every name-pattern key of either source.
    structural_keys: BTreeSet<String>,
    /// Keys backfilled when a feature ends up without them.
    fill_keys: BTreeSet<String>,
}

impl<'c> MergeContext<'c> {
    fn new(
        config: &'c MergeConfig,
        analysis_a: Option<&'c AnalysisResult>,
        analysis_b: Option<&'c AnalysisResult>,
    ) -> Self {
        let id_key = config.id_key();
        let analyses = [analysis_a, analysis_b];

        let mut fill_keys = BTreeSet::new();
        for analysis in analyses.iter().flatten() {
            fill_keys.extend(
                analysis
                    .common_properties
                    .iter()
                    .filter(|key| is_structural_key(key))
                    .cloned(),
            );
            fill_keys.extend(analysis.country_name_property.clone());
        }

        let mut structural_keys = fill_keys.clone();
        structural_keys.insert(id_key.clone());
        for analysis in analyses.iter().flatten() {
            structural_keys.extend(analysis.sovereignty_property_key.clone());
        }

        Self {
            config,
            id_key,
            name_key_a: analysis_a.and_then(|r| r.country_name_property.as_deref()),
            name_key_b: analysis_b.and_then(|r| r.country_name_property.as_deref()),
            details_a: analysis_a.map(AnalysisResult::details_by_name).unwrap_or_default(),
            details_b: analysis_b.map(AnalysisResult::details_by_name).unwrap_or_default(),
            structural_keys,
            fill_keys,
        }
    }

    fn detail_a(&self, feature: Option<&IndexedFeature<'_>>) -> Option<&'c CountryDetail> {
        lookup_detail(&self.details_a, self.name_key_a, feature)
    }

    fn detail_b(&self, feature: Option<&IndexedFeature<'_>>) -> Option<&'c CountryDetail> {
        lookup_detail(&self.details_b, self.name_key_b, feature)
    }

    fn resolve(
        &self,
        id: &FeatureId,
        mut a: Option<&IndexedFeature<'_>>,
        mut b: Option<&IndexedFeature<'_>>,
        selections: &CountrySelections,
        manual: &ManualTranslations,
    ) -> Option<Feature> {
        // Country-level override, keyed by the name shown in the comparison table.
        if let Some(detail) = self.detail_a(a).or_else(|| self.detail_b(b)) {
            match selections.get(&detail.name) {
                Some(CountrySelection::Discard) => {
                    debug!(%id, country = %detail.name, "discarded by country selection");
                    return None;
                }
                Some(CountrySelection::A) => b = None,
                Some(CountrySelection::B) => a = None,
                None => {}
            }
        }
        if a.is_none() && b.is_none() {
            debug!(%id, "no feature left after country selection");
            return None;
        }

        let class = self.effective_class(a, b);
        let translations = self.config.translations_source.get(class);
        let other = self.config.other_properties_source.get(class);

        let Some(geometry) = a
            .and_then(|f| f.feature.geometry.as_ref())
            .or_else(|| b.and_then(|f| f.feature.geometry.as_ref()))
        else {
            debug!(%id, "no geometry in either source");
            return None;
        };
        let geometry = round_geometry(geometry, self.config.geometry_precision);

        let empty = Properties::new();
        let props_a = a.map_or(&empty, |f| &f.properties);
        let props_b = b.map_or(&empty, |f| &f.properties);

        let mut properties = select_other_properties(other, props_a, props_b);
        let definitive_name = self.definitive_name(id, translations, a, b, props_a, props_b);
        let primary_present = translations.primary.order(a.is_some(), b.is_some()).0;
        let dropped = self.apply_translations(
            &mut properties,
            translations,
            props_a,
            props_b,
            primary_present,
            definitive_name.as_deref(),
        );

        let suppress_fill = class == EntityClass::Dependent && translations.primary.is_discard();
        self.fill_missing_names(
            &mut properties,
            definitive_name.as_deref(),
            &dropped,
            suppress_fill,
        );

        let id_value = self.final_id(id, other, props_a, props_b);
        let lookup_key = if is_truthy(&id_value) {
            js_string(&id_value)
        } else {
            id.to_string()
        };
        properties.insert(self.id_key.clone(), id_value);

        if let Some(overrides) = manual.get(&lookup_key) {
            for (key, value) in overrides {
                properties.insert(key.to_lowercase(), Value::String(value.clone()));
            }
        }

        Some(Feature::new(Some(geometry), properties))
    }

    /// Decide which class of rules applies to the surviving features.
    fn effective_class(
        &self,
        a: Option<&IndexedFeature<'_>>,
        b: Option<&IndexedFeature<'_>>,
    ) -> EntityClass {
        let detail_a = self.detail_a(a);
        let detail_b = self.detail_b(b);

        let arbiter = match self.config.other_properties_source.dependent.primary {
            PrimarySource::FileA if detail_a.is_some() => detail_a,
            PrimarySource::FileB if detail_b.is_some() => detail_b,
            _ => detail_a
                .filter(|d| d.is_dependency)
                .or_else(|| detail_b.filter(|d| d.is_dependency))
                .or(detail_a)
                .or(detail_b),
        };
        EntityClass::from_dependency(arbiter.is_some_and(|d| d.is_dependency))
    }

    fn definitive_name(
        &self,
        id: &FeatureId,
        translations: &TranslationPreference,
        a: Option<&IndexedFeature<'_>>,
        b: Option<&IndexedFeature<'_>>,
        props_a: &Properties,
        props_b: &Properties,
    ) -> Option<String> {
        let name_a = self.name_key_a.and_then(|key| truthy_string(props_a, key));
        let name_b = self.name_key_b.and_then(|key| truthy_string(props_b, key));
        let (primary, secondary) = translations.primary.order(props_a, props_b);

        let only_source = match (a.is_some(), b.is_some()) {
            (true, false) => name_a.clone(),
            (false, true) => name_b.clone(),
            _ => None,
        };
        let configured = match translations.primary {
            PrimarySource::FileA => name_a.clone(),
            PrimarySource::FileB => name_b.clone(),
            PrimarySource::Discard => None,
        };

        only_source
            .or(configured)
            .or(name_a)
            .or(name_b)
            .or_else(|| truthy_string(primary, self.name_key_a.unwrap_or("name")))
            .or_else(|| truthy_string(secondary, self.name_key_b.unwrap_or("name")))
            .or_else(|| truthy_string(primary, &self.id_key))
            .or_else(|| Some(id.to_string()))
            .filter(|name| !name.is_empty())
    }

    /// Resolve the name keys into `properties`.
    ///
    /// Returns the keys a non-additive primary lacks; those stay absent. A
    /// primary with no feature for this ID drops nothing.
    fn apply_translations(
        &self,
        properties: &mut Properties,
        translations: &TranslationPreference,
        props_a: &Properties,
        props_b: &Properties,
        primary_present: bool,
        definitive_name: Option<&str>,
    ) -> BTreeSet<String> {
        let name_keys = self.structural_keys.iter().filter(|key| **key != self.id_key);
        let mut dropped = BTreeSet::new();

        if translations.primary.is_discard() {
            for key in name_keys {
                properties.remove(key);
            }
            return dropped;
        }

        let (primary, secondary) = translations.primary.order(props_a, props_b);
        let mut resolved = Properties::new();
        let mut take = |source: &Properties| {
            for (key, value) in source {
                if self.structural_keys.contains(key) {
                    resolved.insert(key.clone(), value.clone());
                }
            }
        };
        if translations.additive {
            take(secondary);
        }
        take(primary);

        for key in name_keys {
            match resolved.get(key).filter(|v| !v.is_null()) {
                Some(value) => {
                    properties.insert(key.clone(), value.clone());
                }
                None if translations.additive => {
                    if let Some(name) = definitive_name.filter(|_| is_autofill_key(key)) {
                        properties.insert(key.clone(), Value::String(name.to_string()));
                    }
                }
                None => {
                    properties.remove(key);
                    if primary_present {
                        dropped.insert(key.clone());
                    }
                }
            }
        }
        dropped
    }

    fn fill_missing_names(
        &self,
        properties: &mut Properties,
        definitive_name: Option<&str>,
        dropped: &BTreeSet<String>,
        suppress: bool,
    ) {
        let english = ENGLISH_NAME_KEYS.iter().find_map(|key| {
            properties
                .get(*key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        });
        let Some(fallback) = english.or_else(|| definitive_name.map(str::to_string)) else {
            return;
        };

        for key in &self.fill_keys {
            if is_present(properties.get(key)) || dropped.contains(key) {
                continue;
            }
            // Dependent features with discarded translations keep only their ID.
            if suppress && *key != self.id_key {
                continue;
            }
            properties.insert(key.clone(), Value::String(fallback.clone()));
        }
    }

    fn final_id(
        &self,
        id: &FeatureId,
        other: &OtherPropertiesPreference,
        props_a: &Properties,
        props_b: &Properties,
    ) -> Value {
        let id_of = |props: &Properties| {
            props
                .get(&self.id_key)
                .filter(|value| !value.is_null())
                .cloned()
        };

        let preferred = if other.primary.is_discard() {
            None
        } else {
            id_of(other.primary.order(props_a, props_b).0)
        };
        preferred
            .or_else(|| id_of(props_a))
            .or_else(|| id_of(props_b))
            .unwrap_or_else(|| id.to_value())
    }
}

/// Other-properties resolution: primary (over secondary when additive), then
/// the allow-list.
fn select_other_properties(
    preference: &OtherPropertiesPreference,
    props_a: &Properties,
    props_b: &Properties,
) -> Properties {
    if preference.primary.is_discard() {
        return Properties::new();
    }

    let (primary, secondary) = preference.primary.order(props_a, props_b);
    let mut merged = Properties::new();
    if preference.additive {
        merged.extend(secondary.clone());
    }
    merged.extend(primary.clone());
    merged.retain(|key, _| preference.is_selected(key));
    merged
}

fn truthy_string(props: &Properties, key: &str) -> Option<String> {
    props.get(key).filter(|v| is_truthy(v)).map(js_string)
}

fn lookup_detail<'c>(
    details: &HashMap<&'c str, &'c CountryDetail>,
    name_key: Option<&str>,
    feature: Option<&IndexedFeature<'_>>,
) -> Option<&'c CountryDetail> {
    let name = truthy_string(&feature?.properties, name_key?)?;
    details.get(name.trim()).copied()
}
