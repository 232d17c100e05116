//! Recognized-state vs. dependent-territory classification.

use std::collections::HashMap;

use crate::models::CountryDetail;
use crate::names::cores_match;

/// Classify one feature from its name and (optional) sovereign value.
///
/// Returns `None` when the name is empty after trimming.
pub fn classify(name: &str, sovereign: Option<&str>) -> Option<CountryDetail> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let Some(sovereign) = sovereign.map(str::trim).filter(|s| !s.is_empty()) else {
        return Some(CountryDetail::recognized(name));
    };

    if name.to_lowercase() == sovereign.to_lowercase() {
        return Some(CountryDetail::recognized(name));
    }

    if cores_match(name, sovereign) {
        // Keep the fuller of the two spellings; ties go to the name.
        let canonical = if sovereign.chars().count() > name.chars().count() {
            sovereign
        } else {
            name
        };
        return Some(CountryDetail::recognized(canonical));
    }

    Some(CountryDetail::dependency(name, sovereign))
}

/// Country details keyed by canonical name.
#[derive(Debug, Default)]
pub struct CountryRegistry {
    details: HashMap<String, CountryDetail>,
}

impl CountryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a detail in. A recognized record replaces a dependency of the same
    /// name; otherwise the first record stays.
    pub fn insert(&mut self, detail: CountryDetail) {
        match self.details.get(&detail.name) {
            None => {
                self.details.insert(detail.name.clone(), detail);
            }
            Some(existing) if existing.is_dependency && !detail.is_dependency => {
                self.details.insert(detail.name.clone(), detail);
            }
            Some(_) => {}
        }
    }

    pub fn len(&self) -> usize {
        self.details.len()
    }

    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    /// Details ordered case-insensitively by name.
    pub fn into_sorted(self) -> Vec<CountryDetail> {
        let mut details: Vec<CountryDetail> = self.details.into_values().collect();
        details.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
        });
        details
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_table() {
        let cases: &[(&str, Option<&str>, &str, bool, Option<&str>)] = &[
            ("France", Some("France"), "France", false, None),
            ("France", None, "France", false, None),
            ("France", Some("   "), "France", false, None),
            ("  france ", Some("FRANCE"), "france", false, None),
            ("Guadeloupe", Some("France"), "Guadeloupe", true, Some("France")),
            ("South Korea", Some("Korea"), "South Korea", false, None),
            ("Korea", Some("North Korea"), "North Korea", false, None),
            ("Czechia", Some("Czech Republic"), "Czech Republic", false, None),
            ("Russia", Some("Russian Federation"), "Russian Federation", false, None),
            ("Greenland", Some("Denmark"), "Greenland", true, Some("Denmark")),
            ("Aruba", Some("Netherlands"), "Aruba", true, Some("Netherlands")),
        ];

        for &(name, sov, canonical, is_dep, sov_state) in cases {
            let detail = classify(name, sov).unwrap();
            assert_eq!(detail.name, canonical, "classify({name:?}, {sov:?})");
            assert_eq!(detail.is_dependency, is_dep, "classify({name:?}, {sov:?})");
            assert_eq!(detail.sovereign_state.as_deref(), sov_state);
        }
    }

    #[test]
    fn test_equal_length_tie_keeps_name() {
        // Both cores are "chad" and both spellings have 9 chars.
        let detail = classify("Chad Rep.", Some("Rep. Chad")).unwrap();
        assert_eq!(detail.name, "Chad Rep.");
        assert!(!detail.is_dependency);
    }

    #[test]
    fn test_empty_name_is_skipped() {
        assert!(classify("  ", Some("France")).is_none());
    }

    #[test]
    fn test_registry_upgrades_dependency() {
        let mut registry = CountryRegistry::new();
        registry.insert(CountryDetail::dependency("Greenland", "Denmark"));
        registry.insert(CountryDetail::recognized("Greenland"));
        registry.insert(CountryDetail::dependency("Greenland", "Denmark"));

        let details = registry.into_sorted();
        assert_eq!(details, vec![CountryDetail::recognized("Greenland")]);
    }

    #[test]
    fn test_registry_keeps_distinct_names() {
        let mut registry = CountryRegistry::new();
        registry.insert(CountryDetail::recognized("Congo"));
        registry.insert(CountryDetail::recognized("Dem. Rep. Congo"));
        registry.insert(CountryDetail::recognized("austria"));
        assert_eq!(registry.len(), 3);

        let names: Vec<String> = registry.into_sorted().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["austria", "Congo", "Dem. Rep. Congo"]);
    }
}
