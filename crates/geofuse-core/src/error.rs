use thiserror::Error;

/// All errors that can occur in geofuse-core.
#[derive(Debug, Error)]
pub enum FusionError {
    #[error("Invalid ID property: {0:?}. Select a property present in both datasets.")]
    InvalidIdProperty(String),

    #[error("Geometry precision {0} is out of range (expected 0..=10)")]
    PrecisionOutOfRange(u8),

    #[error("Invalid GeoJSON input: {0}")]
    InvalidInput(String),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Unsupported settings version. Expected {expected}, found {found}.")]
    UnsupportedSettingsVersion { expected: u32, found: String },

    #[error("Invalid config value: {0}")]
    InvalidConfig(String),

    #[error("Invalid translation dictionary: {0}")]
    InvalidDictionary(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Exit codes used by the `geofuse` binary.
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    NotFound = 2,
    InvalidArgs = 3,
    FileSystemError = 4,
    InvalidSettings = 5,
    NothingToMerge = 6,
}

pub type Result<T> = std::result::Result<T, FusionError>;
