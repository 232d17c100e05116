pub mod analysis;
pub mod geojson;
pub mod merge_config;

pub use analysis::*;
pub use geojson::*;
pub use merge_config::*;
