//! AliveCor report input plugin — recovers the digitized ECG waveform and
//! beat-marker timestamps from the vector drawing commands of a report PDF.
//!
//! The report carries no sample data, only the path operators that render
//! the chart. Loading and decompressing the document is `lopdf`'s job; this
//! crate tokenizes the first page's content stream and runs a structural
//! scan over it (see [`scan`]).

pub mod error;
pub mod scan;
pub mod token;
pub mod transform;

pub use error::ScanError;

use std::path::Path;

use lopdf::Document;

use recover_core::error::{RecoverError, Result};
use recover_core::options::ScanOptions;
use recover_core::plugin::ReportInput;
use recover_core::recording::{BeatMarkers, EcgTrace, Recording, SIGNAL_UNITS, TIME_UNITS};

pub struct AlivecorInput;

impl ReportInput for AlivecorInput {
    fn name(&self) -> &str {
        "AliveCor PDF Input"
    }

    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }

    fn read(&self, input_path: &Path, options: &ScanOptions) -> Result<Recording> {
        log::info!("Reading report: {}", input_path.display());

        let doc = Document::load(input_path)
            .map_err(|e| RecoverError::Pdf(format!("Failed to load PDF: {}", e)))?;

        let content = first_page_content(&doc)?;
        let outcome = scan::scan_content(&content, options)
            .map_err(|e| RecoverError::Scan(e.to_string()))?;

        log::info!(
            "Recovered {} samples across {} subtraces, {} beat markers",
            outcome.times.len(),
            outcome.stats.subtraces,
            outcome.beats.len()
        );

        let trace = EcgTrace::new(outcome.times, outcome.amplitudes)?;
        let mut recording = Recording::new(trace, BeatMarkers::new(outcome.beats));
        recording.metadata.set_label("ECG");
        recording.metadata.set("signal_units", SIGNAL_UNITS);
        recording.metadata.set("time_units", TIME_UNITS);
        if let Some(stem) = input_path.file_stem().and_then(|s| s.to_str()) {
            recording.metadata.set_source(stem);
        }
        Ok(recording)
    }
}

/// Decode the first page's content stream to text.
fn first_page_content(doc: &Document) -> Result<String> {
    let first_page = doc
        .get_pages()
        .values()
        .next()
        .copied()
        .ok_or_else(|| RecoverError::Pdf("Document has no pages".to_string()))?;

    let content = doc
        .get_page_content(first_page)
        .map_err(|e| RecoverError::Pdf(format!("Failed to read page content: {}", e)))?;

    String::from_utf8(content)
        .map_err(|e| RecoverError::Pdf(format!("Content stream is not valid UTF-8: {}", e)))
}
