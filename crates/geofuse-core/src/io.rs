//! Reading and writing GeoJSON files.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::error::{FusionError, Result};
use crate::models::FeatureCollection;

/// Parse a FeatureCollection, naming it `default_name` when it carries no name.
pub fn parse_feature_collection(text: &str, default_name: &str) -> Result<FeatureCollection> {
    let value: Value = serde_json::from_str(text)?;

    match value.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => {}
        Some(other) => {
            return Err(FusionError::InvalidInput(format!(
                "expected a FeatureCollection, found type {other:?}"
            )));
        }
        None => {
            return Err(FusionError::InvalidInput(
                "expected a FeatureCollection, found no \"type\" member".to_string(),
            ));
        }
    }
    if !value.get("features").is_some_and(Value::is_array) {
        return Err(FusionError::InvalidInput(
            "FeatureCollection has no \"features\" array".to_string(),
        ));
    }

    let mut collection: FeatureCollection =
        serde_json::from_value(value).map_err(|e| FusionError::InvalidInput(e.to_string()))?;
    if collection.display_name().is_none() {
        collection.name = Some(default_name.to_string());
    }
    Ok(collection)
}

/// Read a FeatureCollection from disk, defaulting its name to the file stem.
pub fn read_feature_collection(path: &Path) -> Result<FeatureCollection> {
    let text = std::fs::read_to_string(path)?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let collection = parse_feature_collection(&text, &stem)?;
    debug!(
        path = %path.display(),
        features = collection.features.len(),
        "read feature collection"
    );
    Ok(collection)
}

pub fn write_feature_collection(
    path: &Path,
    collection: &FeatureCollection,
    pretty: bool,
) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = if pretty {
        serde_json::to_string_pretty(collection)?
    } else {
        serde_json::to_string(collection)?
    };
    std::fs::write(path, json)?;
    Ok(())
}

/// `<prefix>_<UTC timestamp with ':' and '.' replaced by '-'>.geojson`
pub fn output_file_name(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{prefix}_{}.geojson", now.format("%Y-%m-%dT%H-%M-%S-%3fZ"))
}
