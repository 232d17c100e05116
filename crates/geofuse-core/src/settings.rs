//! The fusion settings artifact: merge policy plus per-entity overrides.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::{FusionError, Result};
use crate::models::{CountrySelections, ManualTranslations, MergeConfig};

pub const SETTINGS_FILE_VERSION: u32 = 1;

/// Everything needed to reproduce a fusion run, as saved to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionSettings {
    pub version: u32,
    pub merge_config: MergeConfig,
    pub country_selections: CountrySelections,
    pub manual_translations: ManualTranslations,
}

impl FusionSettings {
    pub fn new(
        merge_config: MergeConfig,
        country_selections: CountrySelections,
        manual_translations: ManualTranslations,
    ) -> Self {
        Self {
            version: SETTINGS_FILE_VERSION,
            merge_config,
            country_selections,
            manual_translations,
        }
    }

    /// Parse and validate a settings document.
    ///
    /// The version must match exactly; `mergeConfig` and `countrySelections`
    /// must be objects; `manualTranslations` may be missing or `null`.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let mut value: Value = serde_json::from_str(text)?;
        let Some(root) = value.as_object_mut() else {
            return Err(FusionError::InvalidSettings(
                "settings file must contain a JSON object".to_string(),
            ));
        };

        let version = root.get("version").cloned().unwrap_or(Value::Null);
        if version.as_u64() != Some(u64::from(SETTINGS_FILE_VERSION)) {
            return Err(FusionError::UnsupportedSettingsVersion {
                expected: SETTINGS_FILE_VERSION,
                found: version.to_string(),
            });
        }

        for field in ["mergeConfig", "countrySelections"] {
            if !root.get(field).is_some_and(Value::is_object) {
                return Err(FusionError::InvalidSettings(format!(
                    "`{field}` must be an object"
                )));
            }
        }
        match root.get("manualTranslations") {
            None | Some(Value::Null) => {
                root.insert(
                    "manualTranslations".to_string(),
                    Value::Object(Default::default()),
                );
            }
            Some(Value::Object(_)) => {}
            Some(_) => {
                return Err(FusionError::InvalidSettings(
                    "`manualTranslations` must be an object".to_string(),
                ));
            }
        }

        let settings: Self = serde_json::from_value(value)
            .map_err(|e| FusionError::InvalidSettings(e.to_string()))?;
        settings.merge_config.validate_shape()?;
        Ok(settings)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let settings = Self::from_json_str(&text)?;
        info!(path = %path.display(), "loaded fusion settings");
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }
}

/// `geojson_fusion_settings_<timestamp>.json`
pub fn default_file_name(now: DateTime<Utc>) -> String {
    format!(
        "geojson_fusion_settings_{}.json",
        now.format("%Y-%m-%dT%H-%M-%S-%3fZ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CountrySelection, PrimarySource};
    use chrono::TimeZone;
    use serde_json::json;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn sample() -> FusionSettings {
        let mut config = MergeConfig::default();
        config.translations_source.dependent.primary = PrimarySource::Discard;
        config.translations_source.dependent.additive = false;
        FusionSettings::new(
            config,
            CountrySelections::from([("Iceland".to_string(), CountrySelection::Discard)]),
            ManualTranslations::from([(
                "FRA".to_string(),
                BTreeMap::from([("name_de".to_string(), "Frankreich".to_string())]),
            )]),
        )
    }

    #[test]
    fn test_wire_format() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["mergeConfig"]["idProperty"], "iso_a3");
        assert_eq!(
            value["mergeConfig"]["translationsSource"]["dependent"]["primary"],
            "discard"
        );
        assert_eq!(value["countrySelections"]["Iceland"], "discard");
        assert_eq!(value["manualTranslations"]["FRA"]["name_de"], "Frankreich");
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let settings = sample();
        settings.save_to(&path).unwrap();
        let loaded = FusionSettings::load_from(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_rejects_wrong_version() {
        let mut value = serde_json::to_value(sample()).unwrap();
        value["version"] = json!(2);
        let err = FusionSettings::from_json_str(&value.to_string()).unwrap_err();
        assert!(matches!(
            err,
            FusionError::UnsupportedSettingsVersion { expected: 1, .. }
        ));

        value["version"] = json!("1");
        assert!(FusionSettings::from_json_str(&value.to_string()).is_err());
    }

    #[test]
    fn test_rejects_non_object_fields() {
        for field in ["mergeConfig", "countrySelections", "manualTranslations"] {
            let mut value = serde_json::to_value(sample()).unwrap();
            value[field] = json!([]);
            let err = FusionSettings::from_json_str(&value.to_string()).unwrap_err();
            assert!(matches!(err, FusionError::InvalidSettings(_)), "{field}");
        }

        assert!(matches!(
            FusionSettings::from_json_str("[1, 2]"),
            Err(FusionError::InvalidSettings(_))
        ));
        assert!(matches!(
            FusionSettings::from_json_str("not json"),
            Err(FusionError::Json(_))
        ));
    }

    #[test]
    fn test_null_manual_translations_become_empty() {
        let mut value = serde_json::to_value(sample()).unwrap();
        value["manualTranslations"] = Value::Null;
        let settings = FusionSettings::from_json_str(&value.to_string()).unwrap();
        assert!(settings.manual_translations.is_empty());

        value.as_object_mut().unwrap().remove("manualTranslations");
        let settings = FusionSettings::from_json_str(&value.to_string()).unwrap();
        assert!(settings.manual_translations.is_empty());
    }

    #[test]
    fn test_rejects_shape_errors() {
        let mut value = serde_json::to_value(sample()).unwrap();
        value["mergeConfig"]["geometryPrecision"] = json!(12);
        assert!(matches!(
            FusionSettings::from_json_str(&value.to_string()),
            Err(FusionError::PrecisionOutOfRange(12))
        ));

        let mut value = serde_json::to_value(sample()).unwrap();
        value["countrySelections"]["Iceland"] = json!("C");
        assert!(matches!(
            FusionSettings::from_json_str(&value.to_string()),
            Err(FusionError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_default_file_name() {
        let now = Utc.with_ymd_and_hms(2024, 5, 17, 9, 30, 5).unwrap();
        assert_eq!(
            default_file_name(now),
            "geojson_fusion_settings_2024-05-17T09-30-05-000Z.json"
        );
    }
}
