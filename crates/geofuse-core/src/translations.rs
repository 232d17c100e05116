//! Backfilling missing translation keys from an external name dictionary.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{FusionError, Result};
use crate::matcher::{FeatureId, FeatureIndex, union_ids};
use crate::models::{
    AnalysisResult, CountrySelection, CountrySelections, FeatureCollection, ManualTranslations,
    MergeConfig, Properties,
};
use crate::normalize::js_string;

static TRANSLATION_LANGUAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)_([a-z]{2,3}(?:-[a-z]{2,4})?)$").unwrap());

const ENGLISH_NAME_KEYS: &[&str] = &["name_en", "name_eng"];

/// One territory in a name dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictionaryEntry {
    pub iso_a3: String,
    pub english_name: String,
    /// Language code (`de`, `zh-Hant`, ...) to localized name.
    pub names: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DictionaryDocument {
    Entries(Vec<DictionaryEntry>),
    Keyed(BTreeMap<String, BTreeMap<String, String>>),
}

fn is_iso_a3_key(key: &str) -> bool {
    key.len() == 3 && key.bytes().all(|b| b.is_ascii_uppercase())
}

/// Localized territory names, looked up by ISO A3 code or English name.
#[derive(Debug, Clone, Default)]
pub struct TranslationDictionary {
    entries: Vec<DictionaryEntry>,
    by_iso_a3: HashMap<String, usize>,
    by_english_name: HashMap<String, usize>,
}

impl TranslationDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a dictionary document.
    ///
    /// Either a mapping from key to `{language: name}`, where a three-letter
    /// upper-case key is an ISO A3 code and any other key an English name, or
    /// a JSON array of [`DictionaryEntry`] objects.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let document: DictionaryDocument =
            serde_json::from_str(text).map_err(|e| FusionError::InvalidDictionary(e.to_string()))?;
        let mut dictionary = Self::new();
        match document {
            DictionaryDocument::Entries(entries) => {
                for entry in entries {
                    dictionary.insert_entry(entry);
                }
            }
            DictionaryDocument::Keyed(map) => {
                for (key, names) in map {
                    let entry = if is_iso_a3_key(&key) {
                        DictionaryEntry { iso_a3: key, english_name: String::new(), names }
                    } else {
                        DictionaryEntry { iso_a3: String::new(), english_name: key, names }
                    };
                    dictionary.insert_entry(entry);
                }
            }
        }
        Ok(dictionary)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let dictionary = Self::from_json_str(&text)?;
        info!(path = %path.display(), entries = dictionary.len(), "loaded translation dictionary");
        Ok(dictionary)
    }

    /// Add an entry. A later entry with the same code or name shadows the earlier one.
    pub fn insert_entry(&mut self, entry: DictionaryEntry) {
        let index = self.entries.len();
        if !entry.iso_a3.trim().is_empty() {
            self.by_iso_a3.insert(entry.iso_a3.trim().to_uppercase(), index);
        }
        if !entry.english_name.trim().is_empty() {
            self.by_english_name
                .insert(entry.english_name.trim().to_lowercase(), index);
        }
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn by_iso_a3(&self, code: &str) -> Option<&DictionaryEntry> {
        self.by_iso_a3
            .get(&code.to_uppercase())
            .map(|&index| &self.entries[index])
    }

    pub fn by_english_name(&self, name: &str) -> Option<&DictionaryEntry> {
        self.by_english_name
            .get(&name.to_lowercase())
            .map(|&index| &self.entries[index])
    }

    /// Look up by feature ID first, then by English name.
    pub fn lookup(&self, id: &str, english_name: &str) -> Option<&DictionaryEntry> {
        self.by_iso_a3(id)
            .or_else(|| self.by_english_name(english_name))
    }
}

/// Dictionary language code for a translation key, e.g. `name_de` -> `de`.
///
/// `zht` maps to `zh-Hant`. English keys have no code.
pub fn translation_language(key: &str) -> Option<String> {
    let code = TRANSLATION_LANGUAGE
        .captures(key)?
        .get(1)?
        .as_str()
        .to_lowercase();
    match code.as_str() {
        "en" | "eng" => None,
        "zht" => Some("zh-Hant".to_string()),
        _ => Some(code),
    }
}

/// One fused entity that may receive translations.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationCandidate {
    pub id: String,
    pub display_name: String,
    pub is_dependency: bool,
    pub english_name: Option<String>,
    /// Lowercase-keyed properties of the feature in each source.
    pub properties_a: Option<Properties>,
    pub properties_b: Option<Properties>,
}

impl TranslationCandidate {
    /// Name used for dictionary lookups when the ID has no entry.
    pub fn lookup_name(&self) -> &str {
        self.english_name.as_deref().unwrap_or(&self.display_name)
    }

    /// Whether either source already has a non-null value at `key`.
    pub fn has_source_value(&self, key: &str) -> bool {
        [&self.properties_a, &self.properties_b]
            .into_iter()
            .flatten()
            .any(|props| props.get(key).is_some_and(|v| !v.is_null()))
    }
}

fn property_text(properties: Option<&Properties>, key: &str) -> Option<String> {
    let value = properties?.get(key)?;
    if value.is_null() {
        return None;
    }
    let text = js_string(value);
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Every entity present in either source, sorted by ID.
///
/// Entities whose display name is selected for discard are skipped.
pub fn translation_candidates(
    a: &FeatureCollection,
    b: &FeatureCollection,
    analysis_a: &AnalysisResult,
    analysis_b: &AnalysisResult,
    config: &MergeConfig,
    selections: &CountrySelections,
) -> Vec<TranslationCandidate> {
    let id_key = config.id_key();
    let index_a = FeatureIndex::build(&a.features, &id_key);
    let index_b = FeatureIndex::build(&b.features, &id_key);
    let name_key_a = analysis_a.country_name_property.as_deref();
    let name_key_b = analysis_b.country_name_property.as_deref();
    let details_a = analysis_a.details_by_name();
    let details_b = analysis_b.details_by_name();

    let mut ids: Vec<FeatureId> = union_ids(&index_a, &index_b);
    ids.sort_by(|x, y| x.as_str().cmp(y.as_str()));

    let mut candidates: Vec<TranslationCandidate> = Vec::with_capacity(ids.len());
    for id in ids {
        let id_text = id.as_str().to_string();
        if candidates.last().is_some_and(|c| c.id == id_text) {
            continue;
        }
        let props_a = index_a.get(&id).map(|entry| &entry.properties);
        let props_b = index_b.get(&id).map(|entry| &entry.properties);

        let name_a = name_key_a.and_then(|key| property_text(props_a, key));
        let name_b = name_key_b.and_then(|key| property_text(props_b, key));
        let display_name = match (name_a, name_b) {
            (Some(name), _) => name,
            (_, Some(name)) => name,
            _ => id_text.clone(),
        };

        if selections.get(&display_name) == Some(&CountrySelection::Discard) {
            debug!(id = %id_text, "skipping discarded entity");
            continue;
        }

        let is_dependency = [&details_a, &details_b]
            .into_iter()
            .any(|details| details.get(display_name.as_str()).is_some_and(|d| d.is_dependency));

        let english_name = ENGLISH_NAME_KEYS.iter().find_map(|key| {
            property_text(props_a, key).or_else(|| property_text(props_b, key))
        });

        candidates.push(TranslationCandidate {
            id: id_text,
            display_name,
            is_dependency,
            english_name,
            properties_a: props_a.cloned(),
            properties_b: props_b.cloned(),
        });
    }
    candidates
}

/// Fill empty translation keys from `dictionary`.
///
/// A key is filled only when neither source has a value for it and no manual
/// entry exists. Returns the extended map and how many values were added.
pub fn propose_manual_translations(
    candidates: &[TranslationCandidate],
    dictionary: &TranslationDictionary,
    editable_keys: &[String],
    manual: &ManualTranslations,
    include_dependencies: bool,
) -> (ManualTranslations, usize) {
    let mut next = manual.clone();
    let mut applied = 0;

    for candidate in candidates {
        if candidate.is_dependency && !include_dependencies {
            continue;
        }
        let Some(entry) = dictionary.lookup(&candidate.id, candidate.lookup_name()) else {
            continue;
        };
        for key in editable_keys {
            let key = key.to_lowercase();
            if candidate.has_source_value(&key) {
                continue;
            }
            if next.get(&candidate.id).is_some_and(|m| m.contains_key(&key)) {
                continue;
            }
            let Some(language) = translation_language(&key) else {
                continue;
            };
            if let Some(name) = entry.names.get(&language).filter(|n| !n.is_empty()) {
                next.entry(candidate.id.clone())
                    .or_default()
                    .insert(key, name.clone());
                applied += 1;
            }
        }
    }

    info!(applied, candidates = candidates.len(), "proposed dictionary translations");
    (next, applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use serde_json::{Value, json};

    fn collection(value: Value) -> FeatureCollection {
        serde_json::from_value(value).unwrap()
    }

    fn dataset_a() -> FeatureCollection {
        collection(json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "geometry": null, "properties": {
                    "NAME": "France", "SOVEREIGNT": "France", "ISO_A3": "FRA",
                    "NAME_DE": "Frankreich", "NAME_EN": "France" } },
                { "type": "Feature", "geometry": null, "properties": {
                    "NAME": "Guadeloupe", "SOVEREIGNT": "France", "ISO_A3": "GLP",
                    "NAME_DE": null, "NAME_EN": "Guadeloupe" } },
                { "type": "Feature", "geometry": null, "properties": {
                    "NAME": "Iceland", "SOVEREIGNT": "Iceland", "ISO_A3": "ISL",
                    "NAME_DE": null, "NAME_EN": null } }
            ]
        }))
    }

    fn dataset_b() -> FeatureCollection {
        collection(json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "geometry": null, "properties": {
                    "ADMIN": "France", "ISO_A3": "FRA", "NAME_FR": "France" } },
                { "type": "Feature", "geometry": null, "properties": {
                    "ADMIN": "Guadeloupe", "ISO_A3": "GLP", "NAME_FR": "Guadeloupe" } },
                { "type": "Feature", "geometry": null, "properties": {
                    "ADMIN": "Norway", "ISO_A3": "NOR", "NAME_FR": null } }
            ]
        }))
    }

    fn dictionary() -> TranslationDictionary {
        TranslationDictionary::from_json_str(
            &json!([
                { "isoA3": "ISL", "englishName": "Iceland",
                  "names": { "de": "Island", "fr": "Islande", "en": "Iceland" } },
                { "isoA3": "GLP", "englishName": "Guadeloupe",
                  "names": { "de": "Guadeloupe", "fr": "Guadeloupe" } },
                { "isoA3": "NOK", "englishName": "Norway",
                  "names": { "de": "Norwegen", "fr": "Norvège", "zh-Hant": "挪威" } }
            ])
            .to_string(),
        )
        .unwrap()
    }

    fn candidates(selections: &CountrySelections) -> Vec<TranslationCandidate> {
        let (a, b) = (dataset_a(), dataset_b());
        translation_candidates(
            &a,
            &b,
            &analyze("a", &a),
            &analyze("b", &b),
            &MergeConfig::default(),
            selections,
        )
    }

    #[test]
    fn test_translation_language() {
        assert_eq!(translation_language("name_de").as_deref(), Some("de"));
        assert_eq!(translation_language("NAME_PT-BR").as_deref(), Some("pt-br"));
        assert_eq!(translation_language("name_zht").as_deref(), Some("zh-Hant"));
        assert_eq!(translation_language("name_en"), None);
        assert_eq!(translation_language("name_eng"), None);
        assert_eq!(translation_language("iso_a3"), None);
        assert_eq!(translation_language("name_long"), None);
        assert_eq!(translation_language("name"), None);
    }

    #[test]
    fn test_dictionary_lookup() {
        let dictionary = dictionary();
        assert_eq!(dictionary.len(), 3);
        assert_eq!(dictionary.lookup("isl", "").unwrap().english_name, "Iceland");
        assert_eq!(dictionary.lookup("NOR", "NORWAY").unwrap().iso_a3, "NOK");
        assert!(dictionary.lookup("XXX", "Atlantis").is_none());

        assert!(matches!(
            TranslationDictionary::from_json_str("42"),
            Err(FusionError::InvalidDictionary(_))
        ));
    }

    #[test]
    fn test_keyed_dictionary_document() {
        let dictionary = TranslationDictionary::from_json_str(
            r#"{
                "FRA": { "de": "Frankreich" },
                "france": { "es": "Francia" },
                "Iceland": { "de": "Island" }
            }"#,
        )
        .unwrap();
        assert_eq!(dictionary.len(), 3);
        assert_eq!(dictionary.by_iso_a3("fra").unwrap().names["de"], "Frankreich");
        assert_eq!(dictionary.by_english_name("France").unwrap().names["es"], "Francia");
        assert_eq!(dictionary.lookup("XYZ", "iceland").unwrap().names["de"], "Island");
        assert!(dictionary.by_iso_a3("ICE").is_none());

        let empty = TranslationDictionary::from_json_str("{}").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_keyed_dictionary_fills_translations() {
        let dictionary = TranslationDictionary::from_json_str(
            r#"{ "ISL": { "de": "Island" }, "norway": { "fr": "Norvège", "de": "Norwegen" } }"#,
        )
        .unwrap();
        let list = candidates(&CountrySelections::new());
        let keys = vec!["name_de".to_string(), "name_fr".to_string()];
        let (manual, _) =
            propose_manual_translations(&list, &dictionary, &keys, &ManualTranslations::new(), true);

        assert_eq!(manual["NOR"].get("name_de").map(String::as_str), Some("Norwegen"));
        assert_eq!(manual["NOR"].get("name_fr").map(String::as_str), Some("Norvège"));
    }

    #[test]
    fn test_candidates_are_sorted_with_names() {
        let list = candidates(&CountrySelections::new());
        let ids: Vec<&str> = list.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["FRA", "GLP", "ISL", "NOR"]);

        let norway = &list[3];
        assert_eq!(norway.display_name, "Norway");
        assert!(norway.properties_a.is_none());
        assert_eq!(norway.lookup_name(), "Norway");

        let guadeloupe = &list[1];
        assert!(guadeloupe.is_dependency);
        assert_eq!(guadeloupe.english_name.as_deref(), Some("Guadeloupe"));
        assert!(!list[0].is_dependency);
    }

    #[test]
    fn test_candidates_skip_discarded() {
        let selections = CountrySelections::from([("Iceland".to_string(), CountrySelection::Discard)]);
        let list = candidates(&selections);
        assert!(list.iter().all(|c| c.id != "ISL"));
    }

    #[test]
    fn test_propose_fills_only_missing_keys() {
        let list = candidates(&CountrySelections::new());
        let keys: Vec<String> = ["iso_a3", "name", "name_de", "name_en", "name_fr", "name_zht"]
            .iter()
            .map(|k| k.to_string())
            .collect();
        let manual = ManualTranslations::from([(
            "ISL".to_string(),
            BTreeMap::from([("name_fr".to_string(), "Islande (manuel)".to_string())]),
        )]);

        let (next, applied) = propose_manual_translations(&list, &dictionary(), &keys, &manual, true);

        let isl = &next["ISL"];
        assert_eq!(isl["name_de"], "Island");
        assert_eq!(isl["name_fr"], "Islande (manuel)");
        assert!(!isl.contains_key("name_en"));

        // GLP already has name_fr in B; name_de is null in A so it is filled.
        let glp = &next["GLP"];
        assert_eq!(glp["name_de"], "Guadeloupe");
        assert!(!glp.contains_key("name_fr"));

        // NOR resolves through its English name.
        let nor = &next["NOR"];
        assert_eq!(nor["name_de"], "Norwegen");
        assert_eq!(nor["name_fr"], "Norvège");
        assert_eq!(nor["name_zht"], "挪威");

        assert!(!next.contains_key("FRA"));
        assert_eq!(applied, 5);
        assert_eq!(manual.len(), 1);
    }

    #[test]
    fn test_propose_can_exclude_dependencies() {
        let list = candidates(&CountrySelections::new());
        let keys = vec!["name_de".to_string()];
        let (next, applied) =
            propose_manual_translations(&list, &dictionary(), &keys, &ManualTranslations::new(), false);
        assert!(!next.contains_key("GLP"));
        assert_eq!(applied, 2);
    }
}
