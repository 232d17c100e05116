//! Property statistics and key detection heuristics.

use std::collections::{BTreeSet, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{NO_ID_KEY, Properties};
use crate::normalize::js_string;

/// Name keys, most preferred first.
pub const PREFERRED_NAME_KEYS: &[&str] = &[
    "name",
    "admin",
    "sovereignt",
    "name_en",
    "official_name",
    "country_name",
    "cntry_name",
    "cntrynam",
    "name_long",
    "formal_en",
];

/// Sovereignty keys, most preferred first.
pub const PREFERRED_SOVEREIGNTY_KEYS: &[&str] = &[
    "sovereignt",
    "sov_a3",
    "admin0_sov_name",
    "sovereign",
    "admin0_a3_us",
    "iso_a2_eh",
    "admin0_sovereignty",
];

/// ID keys listed ahead of every other candidate, in this order.
pub const PREFERRED_ID_KEYS: &[&str] = &["iso_a3", "admin", "name", "id", "geoid"];

const SOVEREIGNTY_FALLBACK_KEY: &str = "sovereignt";
const MAX_SAMPLES: usize = 5;
const FALLBACK_ID_KEY_COUNT: usize = 5;

static LANGUAGE_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:name|admin|official_name|title|label)_([a-z]{2,3})$").unwrap()
});

/// Language code carried by a `name_xx`-style key, upper-cased.
pub fn language_code(key: &str) -> Option<String> {
    LANGUAGE_KEY
        .captures(key)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_uppercase())
}

/// Occurrence counts and value samples for every property key of a dataset.
#[derive(Debug, Default)]
pub struct PropertyStats {
    /// Keys in first-seen order.
    keys: Vec<String>,
    counts: HashMap<String, usize>,
    /// Up to five distinct stringified non-null values per key.
    samples: HashMap<String, Vec<String>>,
}

impl PropertyStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one feature's (already normalized) properties.
    pub fn observe(&mut self, properties: &Properties) {
        for (key, value) in properties {
            let count = self.counts.entry(key.clone()).or_insert(0);
            if *count == 0 {
                self.keys.push(key.clone());
            }
            *count += 1;

            let samples = self.samples.entry(key.clone()).or_default();
            if samples.len() < MAX_SAMPLES && !value.is_null() {
                let sample = js_string(value);
                if !samples.contains(&sample) {
                    samples.push(sample);
                }
            }
        }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn contains(&self, key: &str) -> bool {
        self.counts.contains_key(key)
    }

    /// Number of features carrying `key`, nulls included.
    pub fn count(&self, key: &str) -> usize {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn distinct_samples(&self, key: &str) -> usize {
        self.samples.get(key).map_or(0, Vec::len)
    }

    pub fn sorted_keys(&self) -> Vec<String> {
        let mut keys = self.keys.clone();
        keys.sort();
        keys
    }

    /// Upper-case language codes from every key, sorted and deduplicated.
    pub fn languages(&self) -> Vec<String> {
        self.keys
            .iter()
            .filter_map(|key| language_code(key))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

fn is_string_on(first: Option<&Properties>, key: &str) -> bool {
    first
        .and_then(|props| props.get(key))
        .is_some_and(|value| value.is_string())
}

/// Walk a preference list, keeping the string-valued key with the highest count.
fn pick_preferred(
    stats: &PropertyStats,
    first: Option<&Properties>,
    preferred: &[&str],
) -> (Option<String>, usize) {
    let mut best = None;
    let mut best_count = 0;
    for key in preferred {
        if stats.contains(key) && is_string_on(first, key) && stats.count(key) > best_count {
            best = Some(key.to_string());
            best_count = stats.count(key);
        }
    }
    (best, best_count)
}

/// Detect the property that carries the country name.
///
/// `first` is the normalized property map of the first feature; candidates must
/// hold a string there.
pub fn select_name_property(
    stats: &PropertyStats,
    first: Option<&Properties>,
    num_features: usize,
) -> Option<String> {
    let (mut best, mut best_count) = pick_preferred(stats, first, PREFERRED_NAME_KEYS);
    let half = num_features as f64 * 0.5;

    if best.is_none() || (best_count as f64) < half {
        for key in stats.keys() {
            let count = stats.count(key);
            if is_string_on(first, key) && count > best_count && count as f64 > half {
                best = Some(key.clone());
                best_count = count;
            }
        }
    }
    best
}

/// Detect the property that carries the sovereign state.
pub fn select_sovereignty_property(
    stats: &PropertyStats,
    first: Option<&Properties>,
    name_key: Option<&str>,
) -> Option<String> {
    let (best, _) = pick_preferred(stats, first, PREFERRED_SOVEREIGNTY_KEYS);
    if best.is_some() {
        return best;
    }

    let name_key = name_key?;
    if stats.contains(SOVEREIGNTY_FALLBACK_KEY)
        && name_key != SOVEREIGNTY_FALLBACK_KEY
        && is_string_on(first, SOVEREIGNTY_FALLBACK_KEY)
    {
        return Some(SOVEREIGNTY_FALLBACK_KEY.to_string());
    }
    None
}

/// Keys that are present on most features and vary enough to identify them.
pub fn potential_id_keys(stats: &PropertyStats, num_features: usize) -> Vec<String> {
    let min_count = num_features as f64 * 0.8;
    let min_distinct = num_features.min(MAX_SAMPLES) as f64 * 0.6;

    let mut keys: Vec<String> = stats
        .keys()
        .iter()
        .filter(|key| stats.count(key) as f64 >= min_count)
        .filter(|key| stats.distinct_samples(key) as f64 > min_distinct)
        .cloned()
        .collect();

    let rank = |key: &str| {
        PREFERRED_ID_KEYS
            .iter()
            .position(|p| *p == key)
            .unwrap_or(PREFERRED_ID_KEYS.len())
    };
    keys.sort_by(|a, b| {
        rank(a.as_str())
            .cmp(&rank(b.as_str()))
            .then_with(|| a.cmp(b))
    });

    if !keys.is_empty() {
        return keys;
    }
    if stats.keys().is_empty() {
        return vec![NO_ID_KEY.to_string()];
    }
    stats
        .keys()
        .iter()
        .take(FALLBACK_ID_KEY_COUNT)
        .cloned()
        .collect()
}
