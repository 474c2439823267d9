//! Pipeline orchestrator — runs a full recovery.
//!
//! Two phases: the input plugin recovers a Recording from the report, then
//! the output plugin persists it. There is no transform stage between them;
//! the recovered recording is written as-is.

use std::path::Path;

use log::info;

use crate::error::{RecoverError, Result};
use crate::options::ScanOptions;
use crate::plugin::{ProgressReporter, RecordingOutput, ReportInput};

/// The recovery pipeline orchestrator.
pub struct Pipeline {
    input_plugin: Box<dyn ReportInput>,
    output_plugin: Box<dyn RecordingOutput>,
    progress_reporter: Option<ProgressReporter>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("input_plugin", &self.input_plugin.name())
            .field("output_plugin", &self.output_plugin.name())
            .field("progress_reporter", &self.progress_reporter.is_some())
            .finish()
    }
}

impl Pipeline {
    pub fn new(
        input_plugin: Box<dyn ReportInput>,
        output_plugin: Box<dyn RecordingOutput>,
    ) -> Self {
        Self {
            input_plugin,
            output_plugin,
            progress_reporter: None,
        }
    }

    /// Set a progress reporter callback.
    pub fn set_progress_reporter(&mut self, reporter: ProgressReporter) {
        self.progress_reporter = Some(reporter);
    }

    /// Run the full recovery pipeline.
    pub fn run(
        &self,
        input_path: &Path,
        output_path: &Path,
        options: &ScanOptions,
    ) -> Result<()> {
        self.report_progress(0.0, "Starting recovery...");

        info!("Running {} input plugin...", self.input_plugin.name());
        self.report_progress(0.01, &format!("Running {} plugin", self.input_plugin.name()));

        let recording = self.input_plugin.read(input_path, options)?;
        self.report_progress(0.60, "Report scan complete");

        info!(
            "Recovered {} samples, {} beat markers",
            recording.trace.len(),
            recording.beats.len()
        );

        info!("Running {} output plugin...", self.output_plugin.name());
        self.report_progress(0.60, &format!("Writing {}...", self.output_plugin.name()));

        self.output_plugin
            .write(&recording, output_path, options)?;

        self.report_progress(1.0, "Recovery complete");
        info!(
            "{} output written to {}",
            self.output_plugin.format(),
            output_path.display()
        );

        Ok(())
    }

    fn report_progress(&self, fraction: f64, message: &str) {
        if let Some(ref reporter) = self.progress_reporter {
            reporter(fraction, message);
        }
    }
}

/// Builder for constructing a pipeline.
pub struct PipelineBuilder {
    input_plugin: Option<Box<dyn ReportInput>>,
    output_plugin: Option<Box<dyn RecordingOutput>>,
    progress_reporter: Option<ProgressReporter>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            input_plugin: None,
            output_plugin: None,
            progress_reporter: None,
        }
    }

    pub fn input(mut self, plugin: Box<dyn ReportInput>) -> Self {
        self.input_plugin = Some(plugin);
        self
    }

    pub fn output(mut self, plugin: Box<dyn RecordingOutput>) -> Self {
        self.output_plugin = Some(plugin);
        self
    }

    pub fn progress_reporter(mut self, reporter: ProgressReporter) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    pub fn build(self) -> Result<Pipeline> {
        let input_plugin = self
            .input_plugin
            .ok_or_else(|| RecoverError::Pipeline("No input plugin specified".to_string()))?;
        let output_plugin = self
            .output_plugin
            .ok_or_else(|| RecoverError::Pipeline("No output plugin specified".to_string()))?;

        let mut pipeline = Pipeline::new(input_plugin, output_plugin);
        if let Some(reporter) = self.progress_reporter {
            pipeline.set_progress_reporter(reporter);
        }
        Ok(pipeline)
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
