// Core export library modules

pub mod config;
pub mod error;
pub mod fetch;
pub mod media;
pub mod messages;
pub mod params;
pub mod scripts;
pub mod settings;
pub mod staging;
pub mod startup;
pub mod timefmt;
pub mod transcoder;

// Re-export commonly used types
pub use config::ExporterConfig;
pub use error::{ExportError, ExportResult};
pub use params::{build_for_settings, build_parameters};
pub use settings::{ExportRequest, ExportSettings, OutputFormat};
pub use staging::{Stream, StreamSource, Workspace};
pub use transcoder::Transcoder;
