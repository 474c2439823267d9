//! Recovery options shared across the pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// All options controlling the recovery pipeline.
///
/// The chart constants are tunables, not discovered from the document: the
/// generating application always draws at the nominal chart speed and gain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    // -- General --
    pub verbose: u8,

    // -- Chart constants --
    /// Nominal chart speed in mm per second.
    pub time_scale: f64,
    /// Nominal chart gain in mm per mV.
    pub amplitude_scale: f64,
    /// Physical length of one PDF point, in mm.
    pub points_to_mm: f64,

    // -- Output (CLI/extension only, not from config file) --
    #[serde(skip)]
    pub output_format: Option<OutputFormat>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            verbose: 0,
            time_scale: 25.0,
            amplitude_scale: 10.0,
            points_to_mm: 25.4 / 72.0,
            output_format: None,
        }
    }
}

/// Output file format for a recovered recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(OutputFormat::Csv),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Csv => write!(f, "CSV"),
            OutputFormat::Json => write!(f, "JSON"),
        }
    }
}
