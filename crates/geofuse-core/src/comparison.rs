//! Side-by-side report of the entities found in two analyses.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::Serialize;

use crate::models::{AnalysisResult, CountrySelection, CountrySelections, EntityClass, PerClass};

/// One canonical name and where it was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRow {
    pub name: String,
    pub is_dependency: bool,
    /// The sovereign state, or the entity's own name when it has none.
    pub sovereign_state: String,
    pub in_a: bool,
    pub in_b: bool,
    pub selection: Option<CountrySelection>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassStats {
    pub common: usize,
    pub unique_a: usize,
    pub unique_b: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RowOrder {
    #[default]
    Name,
    InA,
    InB,
    Selection,
    /// Grouped by sovereign state, recognized entity first in each group.
    Sovereign,
}

#[derive(Debug, Clone, Default)]
pub struct CompareOptions {
    /// Case-insensitive substring filter on the name.
    pub filter: Option<String>,
    pub order: RowOrder,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryComparison {
    pub rows: Vec<ComparisonRow>,
    /// Counted over every name, regardless of the filter.
    pub stats: PerClass<ClassStats>,
}

fn name_order(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn selection_rank(selection: Option<CountrySelection>) -> u8 {
    match selection {
        Some(CountrySelection::A) => 1,
        Some(CountrySelection::B) => 2,
        Some(CountrySelection::Discard) => 3,
        None => 4,
    }
}

fn compare_rows(order: RowOrder, a: &ComparisonRow, b: &ComparisonRow) -> Ordering {
    let by_name = || name_order(&a.name, &b.name);
    match order {
        RowOrder::Name => by_name(),
        RowOrder::InA => b.in_a.cmp(&a.in_a).then_with(by_name),
        RowOrder::InB => b.in_b.cmp(&a.in_b).then_with(by_name),
        RowOrder::Selection => selection_rank(a.selection)
            .cmp(&selection_rank(b.selection))
            .then_with(by_name),
        RowOrder::Sovereign => name_order(&a.sovereign_state, &b.sovereign_state)
            .then_with(|| a.is_dependency.cmp(&b.is_dependency))
            .then_with(by_name),
    }
}

/// Build the comparison rows and per-class counts for two analyses.
///
/// A's detail represents a name found in both.
pub fn compare_countries(
    analysis_a: &AnalysisResult,
    analysis_b: &AnalysisResult,
    selections: &CountrySelections,
    options: &CompareOptions,
) -> CountryComparison {
    let details_a = analysis_a.details_by_name();
    let details_b = analysis_b.details_by_name();
    let names: BTreeSet<&str> = details_a.keys().chain(details_b.keys()).copied().collect();

    let mut stats = PerClass::<ClassStats>::default();
    let mut rows = Vec::with_capacity(names.len());
    for name in names {
        let detail_a = details_a.get(name);
        let detail_b = details_b.get(name);
        let Some(detail) = detail_a.or(detail_b) else {
            continue;
        };
        let (in_a, in_b) = (detail_a.is_some(), detail_b.is_some());

        let class_stats = stats.get_mut(EntityClass::from_dependency(detail.is_dependency));
        match (in_a, in_b) {
            (true, true) => class_stats.common += 1,
            (true, false) => class_stats.unique_a += 1,
            _ => class_stats.unique_b += 1,
        }

        rows.push(ComparisonRow {
            name: detail.name.clone(),
            is_dependency: detail.is_dependency,
            sovereign_state: detail
                .sovereign_state
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| detail.name.clone()),
            in_a,
            in_b,
            selection: selections.get(name).copied(),
        });
    }

    if let Some(filter) = options.filter.as_deref().map(str::to_lowercase).filter(|f| !f.is_empty()) {
        rows.retain(|row| row.name.to_lowercase().contains(&filter));
    }
    rows.sort_by(|a, b| {
        let ordering = compare_rows(options.order, a, b);
        if options.descending {
            ordering.reverse()
        } else {
            ordering
        }
    });

    CountryComparison { rows, stats }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CountryDetail;

    fn analysis(details: Vec<CountryDetail>) -> AnalysisResult {
        AnalysisResult {
            file_name: "test".to_string(),
            num_features: details.len(),
            languages: Vec::new(),
            geometry_precision_score: 0,
            max_coordinate_precision: 0,
            common_properties: Vec::new(),
            potential_id_keys: Vec::new(),
            country_name_property: Some("name".to_string()),
            sovereignty_property_key: None,
            country_details: details,
        }
    }

    fn fixture() -> (AnalysisResult, AnalysisResult) {
        let a = analysis(vec![
            CountryDetail::recognized("France"),
            CountryDetail::dependency("Guadeloupe", "France"),
            CountryDetail::recognized("Iceland"),
            CountryDetail::dependency("Aruba", "Netherlands"),
        ]);
        let b = analysis(vec![
            CountryDetail::recognized("France"),
            CountryDetail::recognized("Guadeloupe"),
            CountryDetail::recognized("Norway"),
            CountryDetail::recognized("Netherlands"),
        ]);
        (a, b)
    }

    fn names(comparison: &CountryComparison) -> Vec<&str> {
        comparison.rows.iter().map(|row| row.name.as_str()).collect()
    }

    #[test]
    fn test_rows_and_stats() {
        let (a, b) = fixture();
        let selections = CountrySelections::from([("Iceland".to_string(), CountrySelection::A)]);
        let comparison = compare_countries(&a, &b, &selections, &CompareOptions::default());

        assert_eq!(
            names(&comparison),
            ["Aruba", "France", "Guadeloupe", "Iceland", "Netherlands", "Norway"]
        );

        let guadeloupe = &comparison.rows[2];
        assert!(guadeloupe.is_dependency);
        assert_eq!(guadeloupe.sovereign_state, "France");
        assert!(guadeloupe.in_a && guadeloupe.in_b);

        let norway = &comparison.rows[5];
        assert_eq!(norway.sovereign_state, "Norway");
        assert!(!norway.in_a && norway.in_b);
        assert_eq!(comparison.rows[3].selection, Some(CountrySelection::A));

        assert_eq!(
            comparison.stats.recognized,
            ClassStats { common: 1, unique_a: 1, unique_b: 2 }
        );
        assert_eq!(
            comparison.stats.dependent,
            ClassStats { common: 1, unique_a: 1, unique_b: 0 }
        );
    }

    #[test]
    fn test_filter_keeps_stats() {
        let (a, b) = fixture();
        let options = CompareOptions {
            filter: Some("LAND".to_string()),
            ..Default::default()
        };
        let comparison = compare_countries(&a, &b, &CountrySelections::new(), &options);
        assert_eq!(names(&comparison), ["Iceland", "Netherlands"]);
        assert_eq!(comparison.stats.recognized.unique_b, 2);
    }

    #[test]
    fn test_group_by_sovereign() {
        let (a, b) = fixture();
        let options = CompareOptions {
            order: RowOrder::Sovereign,
            ..Default::default()
        };
        let comparison = compare_countries(&a, &b, &CountrySelections::new(), &options);
        assert_eq!(
            names(&comparison),
            ["France", "Guadeloupe", "Iceland", "Netherlands", "Aruba", "Norway"]
        );
    }

    #[test]
    fn test_order_by_presence_descending() {
        let (a, b) = fixture();
        let options = CompareOptions {
            order: RowOrder::InA,
            descending: true,
            ..Default::default()
        };
        let comparison = compare_countries(&a, &b, &CountrySelections::new(), &options);
        assert_eq!(
            names(&comparison),
            ["Norway", "Netherlands", "Iceland", "Guadeloupe", "France", "Aruba"]
        );
    }
}
