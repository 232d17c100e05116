pub mod analysis;
pub mod comparison;
pub mod config;
pub mod derive;
pub mod error;
pub mod io;
pub mod matcher;
pub mod merge;
pub mod models;
pub mod names;
pub mod normalize;
pub mod precision;
pub mod settings;
pub mod translations;
pub mod update;

pub use config::AppConfig;
pub use error::{ExitCode, FusionError, Result};
pub use models::*;

pub use analysis::analyze;
pub use comparison::{CompareOptions, CountryComparison, RowOrder, compare_countries};
pub use io::{output_file_name, parse_feature_collection, read_feature_collection, write_feature_collection};
pub use merge::merge;
pub use settings::{FusionSettings, SETTINGS_FILE_VERSION};
pub use translations::{TranslationDictionary, propose_manual_translations, translation_candidates};
pub use update::{Characteristic, ConfigUpdate};
