//! Plugin traits for report inputs and recording outputs.

use std::path::Path;

use crate::error::Result;
use crate::options::{OutputFormat, ScanOptions};
use crate::recording::Recording;

/// Progress reporter callback type.
pub type ProgressReporter = Box<dyn Fn(f64, &str) + Send + Sync>;

/// Report input plugin: recovers a Recording from a printable report file.
pub trait ReportInput: Send + Sync {
    /// Human-readable name of this plugin.
    fn name(&self) -> &str;

    /// File extensions this plugin handles.
    fn supported_extensions(&self) -> &[&str];

    /// Recover a recording from an input file.
    fn read(&self, input_path: &Path, options: &ScanOptions) -> Result<Recording>;
}

/// Recording output plugin: persists a Recording to a target file.
pub trait RecordingOutput: Send + Sync {
    /// Human-readable name of this plugin.
    fn name(&self) -> &str;

    /// The output format this plugin produces.
    fn format(&self) -> OutputFormat;

    /// Write a recording to the target path.
    fn write(
        &self,
        recording: &Recording,
        output_path: &Path,
        options: &ScanOptions,
    ) -> Result<()>;
}
