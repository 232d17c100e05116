use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use geofuse_core::comparison::{CompareOptions, RowOrder, compare_countries};
use geofuse_core::derive::{
    can_configure_merge, default_country_selections, default_id_property,
    is_any_property_selected, manual_translation_keys, with_default_selected_properties,
};
use geofuse_core::settings::{FusionSettings, default_file_name};
use geofuse_core::translations::{
    TranslationDictionary, propose_manual_translations, translation_candidates,
};
use geofuse_core::{
    AnalysisResult, AppConfig, ConfigUpdate, CountrySelections, ExitCode, FeatureCollection,
    FusionError, ManualTranslations, analyze, merge, read_feature_collection,
    write_feature_collection,
};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "geofuse",
    about = "Analyze and fuse two GeoJSON country datasets",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format (for scripts).
    /// Also enabled by setting GEOFUSE_JSON=1.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one GeoJSON FeatureCollection.
    Analyze { file: PathBuf },

    /// Compare the countries and territories found in two datasets.
    Compare {
        a: PathBuf,
        b: PathBuf,
        /// Only show names containing this text (case-insensitive).
        #[arg(long)]
        filter: Option<String>,
        /// Group rows by sovereign state.
        #[arg(long)]
        group: bool,
        /// Settings file whose country selections are shown.
        #[arg(long)]
        settings: Option<PathBuf>,
    },

    /// Fuse two datasets into one FeatureCollection.
    Fuse {
        a: PathBuf,
        b: PathBuf,
        /// Settings file to apply instead of derived defaults.
        #[arg(long)]
        settings: Option<PathBuf>,
        /// Property used to match features across datasets.
        #[arg(long)]
        id_property: Option<String>,
        /// Decimal places kept on coordinates (0-10).
        #[arg(long, allow_negative_numbers = true)]
        precision: Option<i64>,
        /// Name dictionary used to fill missing translations.
        #[arg(long)]
        dictionary: Option<PathBuf>,
        /// Do not fill dictionary translations for dependent territories.
        #[arg(long)]
        skip_dependent_translations: bool,
        /// Output path (defaults to a timestamped file in the output directory).
        #[arg(long)]
        out: Option<PathBuf>,
        /// Also write the settings used for this run.
        #[arg(long)]
        save_settings: Option<PathBuf>,
        #[arg(long)]
        pretty: bool,
    },

    /// Fusion settings files.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Write a settings file with defaults derived from two datasets.
    Init {
        a: PathBuf,
        b: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Validate a settings file.
    Check { file: PathBuf },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show all config values.
    List,
    /// Print the config file path.
    Path,
}

// ─── Main ────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let start = Instant::now();
    let cli = Cli::parse();

    let json_output = cli.json || std::env::var("GEOFUSE_JSON").as_deref() == Ok("1");

    let config = AppConfig::load()?;
    init_tracing(&config);

    match cli.command {
        Commands::Analyze { file } => {
            let dataset = load_dataset(&file, json_output, start)?;
            let analysis = &dataset.analysis;

            if json_output {
                print_ok(serde_json::to_value(analysis)?, start)?;
            } else {
                print_analysis(analysis);
            }
        }

        Commands::Compare {
            a,
            b,
            filter,
            group,
            settings,
        } => {
            let a = load_dataset(&a, json_output, start)?;
            let b = load_dataset(&b, json_output, start)?;
            let selections = match settings {
                Some(path) => load_settings(&path, json_output, start)?.country_selections,
                None => CountrySelections::new(),
            };
            let options = CompareOptions {
                filter,
                order: if group { RowOrder::Sovereign } else { RowOrder::Name },
                descending: false,
            };
            let comparison = compare_countries(&a.analysis, &b.analysis, &selections, &options);

            if json_output {
                print_ok(serde_json::to_value(&comparison)?, start)?;
            } else {
                for row in &comparison.rows {
                    let mark = |present: bool, label: &'static str| if present { label } else { "-" };
                    let kind = if row.is_dependency { "dependent" } else { "recognized" };
                    let choice = row
                        .selection
                        .map(|s| format!("{s:?}"))
                        .unwrap_or_default();
                    println!(
                        "{} {}  {name:<40}  {kind:<10}  {sov:<30}  {choice}",
                        mark(row.in_a, "A"),
                        mark(row.in_b, "B"),
                        name = row.name,
                        sov = row.sovereign_state,
                    );
                }
                for (label, stats) in [
                    ("Recognized", &comparison.stats.recognized),
                    ("Dependent", &comparison.stats.dependent),
                ] {
                    println!(
                        "{label}: {} common, {} only in A, {} only in B",
                        stats.common, stats.unique_a, stats.unique_b
                    );
                }
            }
        }

        Commands::Fuse {
            a,
            b,
            settings,
            id_property,
            precision,
            dictionary,
            skip_dependent_translations,
            out,
            save_settings,
            pretty,
        } => {
            let a = load_dataset(&a, json_output, start)?;
            let b = load_dataset(&b, json_output, start)?;
            let mut state = initial_settings(&config, &a, &b, settings.as_deref(), json_output, start)?;

            if let Some(id) = id_property {
                let updated = state.merge_config.apply(ConfigUpdate::IdProperty(id));
                state.merge_config =
                    with_default_selected_properties(&updated, Some(&a.analysis), Some(&b.analysis));
            }
            if let Some(precision) = precision {
                state.merge_config = state
                    .merge_config
                    .apply(ConfigUpdate::GeometryPrecision(precision));
            }

            if !can_configure_merge(&state.merge_config, Some(&a.analysis), Some(&b.analysis)) {
                exit_with(
                    json_output,
                    start,
                    ExitCode::InvalidArgs,
                    "invalid_id_property",
                    format!(
                        "No usable ID property (got {:?}). Candidates in A: {}; in B: {}",
                        state.merge_config.id_property,
                        a.analysis.potential_id_keys.join(", "),
                        b.analysis.potential_id_keys.join(", ")
                    ),
                );
            }
            if !is_any_property_selected(&state.merge_config) {
                exit_with(
                    json_output,
                    start,
                    ExitCode::NothingToMerge,
                    "nothing_to_merge",
                    "Every property group is discarded; nothing would be merged.".to_string(),
                );
            }

            let mut translations_applied = 0;
            if let Some(path) = dictionary {
                require_file(&path, json_output, start);
                let dictionary = TranslationDictionary::load_from(&path)?;
                let candidates = translation_candidates(
                    &a.collection,
                    &b.collection,
                    &a.analysis,
                    &b.analysis,
                    &state.merge_config,
                    &state.country_selections,
                );
                let keys = manual_translation_keys(Some(&a.analysis), Some(&b.analysis));
                let (manual, applied) = propose_manual_translations(
                    &candidates,
                    &dictionary,
                    &keys,
                    &state.manual_translations,
                    !skip_dependent_translations,
                );
                state.manual_translations = manual;
                translations_applied = applied;
            }

            let fused = merge(
                &a.collection,
                &b.collection,
                &state.merge_config,
                Some(&a.analysis),
                Some(&b.analysis),
                &state.country_selections,
                &state.manual_translations,
            )?;

            let out = out.unwrap_or_else(|| config.output_path(Utc::now()));
            write_feature_collection(&out, &fused, pretty || config.output.pretty)
                .with_context(|| format!("writing {}", out.display()))?;
            if let Some(path) = &save_settings {
                state
                    .save_to(path)
                    .with_context(|| format!("writing {}", path.display()))?;
            }
            info!(output = %out.display(), features = fused.features.len(), "fusion complete");

            if json_output {
                print_ok(
                    serde_json::json!({
                        "output": out,
                        "name": fused.name,
                        "features": fused.features.len(),
                        "id_property": state.merge_config.id_property,
                        "translations_applied": translations_applied,
                        "settings": save_settings,
                    }),
                    start,
                )?;
            } else {
                println!(
                    "Wrote {} features to {}",
                    fused.features.len(),
                    out.display()
                );
                if translations_applied > 0 {
                    println!("Filled {translations_applied} translations from the dictionary");
                }
            }
        }

        Commands::Settings { action } => match action {
            SettingsAction::Init { a, b, out } => {
                let a = load_dataset(&a, json_output, start)?;
                let b = load_dataset(&b, json_output, start)?;
                let settings = initial_settings(&config, &a, &b, None, json_output, start)?;
                let out = out.unwrap_or_else(|| {
                    PathBuf::from(&config.output.directory).join(default_file_name(Utc::now()))
                });
                settings
                    .save_to(&out)
                    .with_context(|| format!("writing {}", out.display()))?;

                if json_output {
                    print_ok(
                        serde_json::json!({ "path": out, "settings": settings }),
                        start,
                    )?;
                } else {
                    println!("Wrote settings to {}", out.display());
                }
            }
            SettingsAction::Check { file } => {
                let settings = load_settings(&file, json_output, start)?;
                if json_output {
                    print_ok(serde_json::to_value(&settings)?, start)?;
                } else {
                    println!("Settings OK: {}", file.display());
                    println!("  ID property:         {}", settings.merge_config.id_property);
                    println!("  Geometry precision:  {}", settings.merge_config.geometry_precision);
                    println!("  Country selections:  {}", settings.country_selections.len());
                    println!("  Manual translations: {}", settings.manual_translations.len());
                }
            }
        },

        Commands::Config { action } => match action {
            ConfigAction::List => {
                let kv = config_key_values(&config);
                if json_output {
                    print_ok(serde_json::to_value(&kv)?, start)?;
                } else {
                    for (k, v) in &kv {
                        println!("{k} = {v}");
                    }
                }
            }
            ConfigAction::Path => {
                let path = AppConfig::config_path();
                if json_output {
                    print_ok(
                        serde_json::json!({ "path": path, "exists": path.exists() }),
                        start,
                    )?;
                } else {
                    println!("{}", path.display());
                }
            }
        },
    }

    Ok(())
}

// ─── Helpers ────────────────────────────────────────────────────────────────

struct Dataset {
    collection: FeatureCollection,
    analysis: AnalysisResult,
}

fn init_tracing(config: &AppConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

fn print_ok(data: serde_json::Value, start: Instant) -> Result<()> {
    print_json(&serde_json::json!({
        "status": "ok",
        "data": data,
        "meta": { "duration_ms": start.elapsed().as_millis() }
    }))
}

/// Report an error in the selected output format and exit with `code`.
fn exit_with(json_output: bool, start: Instant, code: ExitCode, error: &str, message: String) -> ! {
    if json_output {
        let envelope = serde_json::json!({
            "status": "error",
            "error": error,
            "message": message,
            "meta": { "duration_ms": start.elapsed().as_millis() }
        });
        println!("{}", serde_json::to_string_pretty(&envelope).unwrap_or_default());
    } else {
        eprintln!("{message}");
    }
    std::process::exit(code as i32);
}

fn require_file(path: &Path, json_output: bool, start: Instant) {
    if !path.is_file() {
        exit_with(
            json_output,
            start,
            ExitCode::NotFound,
            "not_found",
            format!("File not found: {}", path.display()),
        );
    }
}

fn load_dataset(path: &Path, json_output: bool, start: Instant) -> Result<Dataset> {
    require_file(path, json_output, start);
    let collection = match read_feature_collection(path) {
        Ok(collection) => collection,
        Err(e @ (FusionError::InvalidInput(_) | FusionError::Json(_))) => exit_with(
            json_output,
            start,
            ExitCode::InvalidArgs,
            "invalid_input",
            format!("{}: {e}", path.display()),
        ),
        Err(e) => {
            return Err(e).with_context(|| format!("reading {}", path.display()));
        }
    };
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let analysis = analyze(&file_name, &collection);
    Ok(Dataset {
        collection,
        analysis,
    })
}

fn load_settings(path: &Path, json_output: bool, start: Instant) -> Result<FusionSettings> {
    require_file(path, json_output, start);
    match FusionSettings::load_from(path) {
        Ok(settings) => Ok(settings),
        Err(e @ FusionError::Io(_)) => {
            Err(e).with_context(|| format!("reading {}", path.display()))
        }
        Err(e) => exit_with(
            json_output,
            start,
            ExitCode::InvalidSettings,
            "invalid_settings",
            format!("{}: {e}", path.display()),
        ),
    }
}

/// Settings from `settings_path`, or defaults derived from both analyses.
///
/// Country selections are reconciled with the datasets either way.
fn initial_settings(
    config: &AppConfig,
    a: &Dataset,
    b: &Dataset,
    settings_path: Option<&Path>,
    json_output: bool,
    start: Instant,
) -> Result<FusionSettings> {
    let (analysis_a, analysis_b) = (Some(&a.analysis), Some(&b.analysis));

    let (merge_config, previous, manual) = match settings_path {
        Some(path) => {
            let loaded = load_settings(path, json_output, start)?;
            (
                loaded.merge_config,
                loaded.country_selections,
                loaded.manual_translations,
            )
        }
        None => {
            let base = config.merge_config();
            let id = default_id_property(
                analysis_a,
                analysis_b,
                &base.id_property,
                &config.fusion.default_id_property,
            );
            let merge_config = with_default_selected_properties(
                &base.apply(ConfigUpdate::IdProperty(id)),
                analysis_a,
                analysis_b,
            );
            (merge_config, CountrySelections::new(), ManualTranslations::new())
        }
    };

    let selections = default_country_selections(&previous, &a.analysis, &b.analysis);
    Ok(FusionSettings::new(merge_config, selections, manual))
}

fn print_analysis(analysis: &AnalysisResult) {
    let or_none = |value: &Option<String>| value.clone().unwrap_or_else(|| "(none)".to_string());
    let dependent = analysis
        .country_details
        .iter()
        .filter(|d| d.is_dependency)
        .count();

    println!("File:               {}", analysis.file_name);
    println!("Features:           {}", analysis.num_features);
    println!("Name property:      {}", or_none(&analysis.country_name_property));
    println!("Sovereignty key:    {}", or_none(&analysis.sovereignty_property_key));
    println!("ID candidates:      {}", analysis.potential_id_keys.join(", "));
    println!("Languages:          {}", analysis.languages.join(", "));
    println!("Positions:          {}", analysis.geometry_precision_score);
    println!("Max decimal places: {}", analysis.max_coordinate_precision);
    println!(
        "Countries:          {} recognized, {dependent} dependent",
        analysis.country_details.len() - dependent
    );
    println!("Properties:         {}", analysis.common_properties.len());
}

fn config_key_values(config: &AppConfig) -> BTreeMap<&'static str, String> {
    let mut map = BTreeMap::new();
    map.insert("config_path", AppConfig::config_path().to_string_lossy().to_string());
    map.insert("fusion.default_id_property", config.fusion.default_id_property.clone());
    map.insert("fusion.geometry_precision", config.fusion.geometry_precision.to_string());
    map.insert("output.directory", config.output.directory.clone());
    map.insert("output.file_prefix", config.output.file_prefix.clone());
    map.insert("output.pretty", config.output.pretty.to_string());
    map.insert("logging.level", config.logging.level.clone());
    map
}
