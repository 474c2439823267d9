//! Recovered recording intermediate representation.
//!
//! All recovery passes through this IR: Input Plugin → Recording → Output
//! Plugin. A recording is a continuous signal (time axis plus matched
//! amplitude sequence) and a standalone ordered sequence of beat timestamps.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{RecoverError, Result};

/// Physical units of the recovered signal.
pub const SIGNAL_UNITS: &str = "mV";
/// Physical units of both time axes.
pub const TIME_UNITS: &str = "s";

/// The continuous ECG signal: a time axis and a matched amplitude sequence.
///
/// Both sequences are immutable once constructed and always the same length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EcgTrace {
    times: Vec<f64>,
    amplitudes: Vec<f64>,
}

impl EcgTrace {
    /// Build a trace from parallel arrays. Fails if the lengths differ.
    pub fn new(times: Vec<f64>, amplitudes: Vec<f64>) -> Result<Self> {
        if times.len() != amplitudes.len() {
            return Err(RecoverError::Recording(format!(
                "time axis has {} samples but amplitude sequence has {}",
                times.len(),
                amplitudes.len()
            )));
        }
        Ok(Self { times, amplitudes })
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn amplitudes(&self) -> &[f64] {
        &self.amplitudes
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Timestamp of the last sample, or 0 for an empty trace.
    pub fn duration(&self) -> f64 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// Iterate over (time, amplitude) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.times
            .iter()
            .copied()
            .zip(self.amplitudes.iter().copied())
    }
}

/// Ordered beat-marker timestamps. No amplitude is associated with a beat.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeatMarkers(Vec<f64>);

impl BeatMarkers {
    pub fn new(times: Vec<f64>) -> Self {
        Self(times)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A complete recovered recording, handed from input plugin to output plugins.
#[derive(Debug, Clone, Default)]
pub struct Recording {
    pub metadata: Metadata,
    pub trace: EcgTrace,
    pub beats: BeatMarkers,
}

impl Recording {
    pub fn new(trace: EcgTrace, beats: BeatMarkers) -> Self {
        Self {
            metadata: Metadata::new(),
            trace,
            beats,
        }
    }
}

/// Flat key/value metadata for a recording (source file, channel labels,
/// units). Keys are ordered so serialized output is deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    items: BTreeMap<String, String>,
}

impl Metadata {
    pub fn new() -> Self {
        Self {
            items: BTreeMap::new(),
        }
    }

    /// Set a term to a value, replacing any existing value.
    pub fn set(&mut self, term: impl Into<String>, value: impl Into<String>) {
        self.items.insert(term.into(), value.into());
    }

    pub fn get(&self, term: &str) -> Option<&str> {
        self.items.get(term).map(String::as_str)
    }

    pub fn contains(&self, term: &str) -> bool {
        self.items.contains_key(term)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    // -- Convenience accessors for common terms --

    pub fn source(&self) -> Option<&str> {
        self.get("source")
    }

    pub fn set_source(&mut self, source: impl Into<String>) {
        self.set("source", source);
    }

    pub fn label(&self) -> Option<&str> {
        self.get("label")
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.set("label", label);
    }
}
