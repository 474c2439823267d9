//! JSON output plugin — serializes a recording to a single JSON document.

use std::path::Path;

use serde_json::json;

use recover_core::error::{RecoverError, Result};
use recover_core::options::{OutputFormat, ScanOptions};
use recover_core::plugin::RecordingOutput;
use recover_core::recording::{Recording, SIGNAL_UNITS, TIME_UNITS};

pub struct JsonOutputPlugin;

impl RecordingOutput for JsonOutputPlugin {
    fn name(&self) -> &str {
        "JSON Output"
    }

    fn format(&self) -> OutputFormat {
        OutputFormat::Json
    }

    fn write(
        &self,
        recording: &Recording,
        output_path: &Path,
        _options: &ScanOptions,
    ) -> Result<()> {
        log::info!("Writing JSON: {}", output_path.display());

        let doc = json!({
            "metadata": recording.metadata,
            "signal": {
                "units": SIGNAL_UNITS,
                "time_units": TIME_UNITS,
                "duration_s": recording.trace.duration().ceil(),
                "times": recording.trace.times(),
                "amplitudes": recording.trace.amplitudes(),
            },
            "beats": {
                "time_units": TIME_UNITS,
                "times": recording.beats.as_slice(),
            },
        });

        let text = serde_json::to_string_pretty(&doc)
            .map_err(|e| RecoverError::Output(format!("Failed to serialize JSON: {}", e)))?;
        std::fs::write(output_path, text)
            .map_err(|e| RecoverError::Output(format!("Failed to write JSON: {}", e)))?;

        Ok(())
    }
}
