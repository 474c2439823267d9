//! CSV output plugin — writes the recovered signal and beat markers as CSV.
//!
//! The signal goes to the requested path; beat markers go to a sibling file
//! (`out.csv` → `out.beats.csv`) so both channels stay plain tabular data.

use std::path::{Path, PathBuf};

use recover_core::error::{RecoverError, Result};
use recover_core::options::{OutputFormat, ScanOptions};
use recover_core::plugin::RecordingOutput;
use recover_core::recording::Recording;

pub struct CsvOutputPlugin;

impl RecordingOutput for CsvOutputPlugin {
    fn name(&self) -> &str {
        "CSV Output"
    }

    fn format(&self) -> OutputFormat {
        OutputFormat::Csv
    }

    fn write(
        &self,
        recording: &Recording,
        output_path: &Path,
        _options: &ScanOptions,
    ) -> Result<()> {
        log::info!("Writing CSV: {}", output_path.display());

        let mut signal = String::from("time_s,amplitude_mv\n");
        for (t, v) in recording.trace.iter() {
            signal.push_str(&format!("{:.6},{:.6}\n", t, v));
        }
        std::fs::write(output_path, signal)
            .map_err(|e| RecoverError::Output(format!("Failed to write signal CSV: {}", e)))?;

        let beats_file = beats_path(output_path);
        log::info!("Writing beat markers: {}", beats_file.display());

        let mut beats = String::from("time_s\n");
        for t in recording.beats.as_slice() {
            beats.push_str(&format!("{:.6}\n", t));
        }
        std::fs::write(&beats_file, beats)
            .map_err(|e| RecoverError::Output(format!("Failed to write beats CSV: {}", e)))?;

        Ok(())
    }
}

/// Beat markers go next to the signal file: `out.csv` → `out.beats.csv`.
fn beats_path(signal_path: &Path) -> PathBuf {
    signal_path.with_extension("beats.csv")
}
