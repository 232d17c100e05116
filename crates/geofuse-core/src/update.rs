//! Immutable, per-field updates to merge configuration and override maps.

use std::collections::BTreeMap;

use tracing::debug;

use crate::models::{
    CountrySelection, CountrySelections, EntityClass, ManualTranslations, MAX_GEOMETRY_PRECISION,
    MergeConfig, PrimarySource,
};

/// Which half of the per-class policy an update targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Characteristic {
    Translations,
    OtherProperties,
}

/// Every editable path of a [`MergeConfig`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigUpdate {
    IdProperty(String),
    /// Clamped into `0..=10`.
    GeometryPrecision(i64),
    Primary {
        characteristic: Characteristic,
        class: EntityClass,
        source: PrimarySource,
    },
    Additive {
        characteristic: Characteristic,
        class: EntityClass,
        additive: bool,
    },
    ToggleSelectedProperty {
        class: EntityClass,
        key: String,
        selected: bool,
    },
    SelectedProperties {
        class: EntityClass,
        selected: BTreeMap<String, bool>,
    },
}

impl MergeConfig {
    /// Return a new config with `update` applied. Rejected updates return an
    /// unchanged copy.
    pub fn apply(&self, update: ConfigUpdate) -> MergeConfig {
        let mut next = self.clone();
        match update {
            ConfigUpdate::IdProperty(id) => next.id_property = id.to_lowercase(),
            ConfigUpdate::GeometryPrecision(precision) => {
                next.geometry_precision =
                    precision.clamp(0, i64::from(MAX_GEOMETRY_PRECISION)) as u8;
            }
            ConfigUpdate::Primary {
                characteristic: Characteristic::Translations,
                class,
                source,
            } => {
                if class == EntityClass::Recognized && source.is_discard() {
                    debug!("recognized translations cannot be discarded, ignoring");
                    return next;
                }
                let mut pref = next.translations_source.get(class).clone();
                pref.primary = source;
                if source.is_discard() {
                    pref.additive = false;
                }
                next.translations_source = next.translations_source.with(class, pref);
            }
            ConfigUpdate::Primary {
                characteristic: Characteristic::OtherProperties,
                class,
                source,
            } => {
                let mut pref = next.other_properties_source.get(class).clone();
                pref.primary = source;
                if source.is_discard() {
                    pref.additive = false;
                    pref.selected_properties.clear();
                }
                next.other_properties_source = next.other_properties_source.with(class, pref);
            }
            ConfigUpdate::Additive {
                characteristic: Characteristic::Translations,
                class,
                additive,
            } => {
                let mut pref = next.translations_source.get(class).clone();
                if pref.primary.is_discard() {
                    return next;
                }
                pref.additive = additive;
                next.translations_source = next.translations_source.with(class, pref);
            }
            ConfigUpdate::Additive {
                characteristic: Characteristic::OtherProperties,
                class,
                additive,
            } => {
                let mut pref = next.other_properties_source.get(class).clone();
                if pref.primary.is_discard() {
                    return next;
                }
                pref.additive = additive;
                next.other_properties_source = next.other_properties_source.with(class, pref);
            }
            ConfigUpdate::ToggleSelectedProperty {
                class,
                key,
                selected,
            } => {
                let mut pref = next.other_properties_source.get(class).clone();
                pref.selected_properties.insert(key, selected);
                next.other_properties_source = next.other_properties_source.with(class, pref);
            }
            ConfigUpdate::SelectedProperties { class, selected } => {
                let mut pref = next.other_properties_source.get(class).clone();
                pref.selected_properties = selected;
                next.other_properties_source = next.other_properties_source.with(class, pref);
            }
        }
        next
    }
}

/// Selections with `name` set to `choice`, or cleared when `choice` is `None`.
pub fn with_selection(
    selections: &CountrySelections,
    name: &str,
    choice: Option<CountrySelection>,
) -> CountrySelections {
    let mut next = selections.clone();
    match choice {
        Some(choice) => {
            next.insert(name.to_string(), choice);
        }
        None => {
            next.remove(name);
        }
    }
    next
}

/// Manual translations with `key` (lowercased) of feature `id` set to `value`.
pub fn with_manual_translation(
    translations: &ManualTranslations,
    id: &str,
    key: &str,
    value: &str,
) -> ManualTranslations {
    let mut next = translations.clone();
    next.entry(id.to_string())
        .or_default()
        .insert(key.to_lowercase(), value.to_string());
    next
}
