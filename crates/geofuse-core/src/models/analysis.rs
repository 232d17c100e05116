use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Identity of one political entity as seen by a single dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryDetail {
    /// Canonical display name, unique within one analysis.
    pub name: String,
    pub is_dependency: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sovereign_state: Option<String>,
}

impl CountryDetail {
    pub fn recognized(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dependency: false,
            sovereign_state: None,
        }
    }

    pub fn dependency(name: impl Into<String>, sovereign_state: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dependency: true,
            sovereign_state: Some(sovereign_state.into()),
        }
    }
}

/// Read-only summary of one source dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub file_name: String,
    pub num_features: usize,
    /// Upper-case language codes found in `name_xx`-style keys, sorted.
    pub languages: Vec<String>,
    /// Total number of positions across all geometries.
    pub geometry_precision_score: usize,
    /// Largest decimal-place count seen on any coordinate.
    pub max_coordinate_precision: usize,
    /// Every lowercase property key seen, sorted.
    pub common_properties: Vec<String>,
    pub potential_id_keys: Vec<String>,
    pub country_name_property: Option<String>,
    pub sovereignty_property_key: Option<String>,
    pub country_details: Vec<CountryDetail>,
}

impl AnalysisResult {
    /// Index the country details by canonical name.
    pub fn details_by_name(&self) -> HashMap<&str, &CountryDetail> {
        self.country_details
            .iter()
            .map(|detail| (detail.name.as_str(), detail))
            .collect()
    }

    pub fn find_detail(&self, name: &str) -> Option<&CountryDetail> {
        self.country_details.iter().find(|detail| detail.name == name)
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.common_properties.iter().any(|k| k == key)
    }
}
