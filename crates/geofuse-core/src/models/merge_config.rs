use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{FusionError, Result};

/// Sentinel reported by the analyzer when no ID key candidate exists.
pub const NO_ID_KEY: &str = "none_found";

/// Highest accepted `geometry_precision`.
pub const MAX_GEOMETRY_PRECISION: u8 = 10;

/// Which source is authoritative for a characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimarySource {
    #[serde(rename = "fileA")]
    FileA,
    #[serde(rename = "fileB")]
    FileB,
    #[serde(rename = "discard")]
    Discard,
}

impl PrimarySource {
    pub fn is_discard(self) -> bool {
        self == PrimarySource::Discard
    }

    /// Order two per-source values as `(primary, secondary)`.
    ///
    /// Anything other than `FileA` treats B as primary, `Discard` included.
    pub fn order<T>(self, a: T, b: T) -> (T, T) {
        match self {
            PrimarySource::FileA => (a, b),
            PrimarySource::FileB | PrimarySource::Discard => (b, a),
        }
    }
}

/// Recognized sovereign state vs. dependent territory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityClass {
    Recognized,
    Dependent,
}

impl EntityClass {
    pub const ALL: [EntityClass; 2] = [EntityClass::Recognized, EntityClass::Dependent];

    pub fn from_dependency(is_dependency: bool) -> Self {
        if is_dependency {
            EntityClass::Dependent
        } else {
            EntityClass::Recognized
        }
    }
}

/// One value per entity class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerClass<T> {
    pub recognized: T,
    pub dependent: T,
}

impl<T> PerClass<T> {
    pub fn get(&self, class: EntityClass) -> &T {
        match class {
            EntityClass::Recognized => &self.recognized,
            EntityClass::Dependent => &self.dependent,
        }
    }

    pub fn get_mut(&mut self, class: EntityClass) -> &mut T {
        match class {
            EntityClass::Recognized => &mut self.recognized,
            EntityClass::Dependent => &mut self.dependent,
        }
    }

    /// Copy with the `class` entry replaced.
    pub fn with(&self, class: EntityClass, value: T) -> Self
    where
        T: Clone,
    {
        let mut next = self.clone();
        match class {
            EntityClass::Recognized => next.recognized = value,
            EntityClass::Dependent => next.dependent = value,
        }
        next
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationPreference {
    pub primary: PrimarySource,
    pub additive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtherPropertiesPreference {
    pub primary: PrimarySource,
    pub additive: bool,
    /// Allow-list: only keys mapped to `true` are emitted.
    #[serde(default)]
    pub selected_properties: BTreeMap<String, bool>,
}

impl OtherPropertiesPreference {
    pub fn is_selected(&self, key: &str) -> bool {
        self.selected_properties.get(key).copied().unwrap_or(false)
    }
}

/// User-configurable merge policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeConfig {
    pub id_property: String,
    pub geometry_precision: u8,
    pub translations_source: PerClass<TranslationPreference>,
    pub other_properties_source: PerClass<OtherPropertiesPreference>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        let translations = TranslationPreference {
            primary: PrimarySource::FileA,
            additive: true,
        };
        let other = OtherPropertiesPreference {
            primary: PrimarySource::FileA,
            additive: true,
            selected_properties: BTreeMap::new(),
        };
        Self {
            id_property: "iso_a3".to_string(),
            geometry_precision: 6,
            translations_source: PerClass {
                recognized: translations.clone(),
                dependent: translations,
            },
            other_properties_source: PerClass {
                recognized: other.clone(),
                dependent: other,
            },
        }
    }
}

impl MergeConfig {
    pub fn id_key(&self) -> String {
        self.id_property.to_lowercase()
    }

    /// Whether `id_property` can be used to match features.
    pub fn has_valid_id_property(&self) -> bool {
        is_valid_id_property(&self.id_property)
    }

    /// Range checks that hold for any stored config, even before an ID
    /// property has been chosen.
    pub fn validate_shape(&self) -> Result<()> {
        if self.geometry_precision > MAX_GEOMETRY_PRECISION {
            return Err(FusionError::PrecisionOutOfRange(self.geometry_precision));
        }
        Ok(())
    }

    /// Check the constraints the merge engine relies on.
    pub fn validate(&self) -> Result<()> {
        if !self.has_valid_id_property() {
            return Err(FusionError::InvalidIdProperty(self.id_property.clone()));
        }
        self.validate_shape()
    }
}

pub fn is_valid_id_property(id_property: &str) -> bool {
    let trimmed = id_property.trim();
    !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case(NO_ID_KEY)
}

/// Per-entity forced source pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CountrySelection {
    A,
    B,
    #[serde(rename = "discard")]
    Discard,
}

/// Canonical country name → forced choice. Absence means default behaviour.
pub type CountrySelections = BTreeMap<String, CountrySelection>;

/// Final feature ID → (lowercase property key → value).
pub type ManualTranslations = BTreeMap<String, BTreeMap<String, String>>;
