//! Structural scan over the first-page content stream.
//!
//! The report carries no digital samples; the trace has to be recovered from
//! the path-drawing operators themselves. The generating application always
//! draws the chart with the same fixed structure, which leaves enough cues
//! behind to tell data apart from decoration:
//!
//! - the page is a sequence of top-level save/restore blocks ("stages");
//!   stage 2 draws the chart frame and grids, stage 3 the calibration pulse,
//!   the trace and the beat markers;
//! - each kind of object announces itself with a specific line width
//!   (0.4 border, 0.3 vertical grid, 1.5 calibration, 0.4 trace,
//!   0.6 beat marker);
//! - sibling objects drawn without a width re-declaration are told apart by
//!   counting the save/restore blocks that close between them.
//!
//! The scan is a single forward pass with no backtracking: every token
//! mutates the graphics-state stack and the current role, and under
//! path-interpreting roles appends samples to the output accumulators.

use log::debug;

use recover_core::options::ScanOptions;

use crate::error::ScanError;
use crate::token::{tokenize, Token};
use crate::transform::GraphicsMap;

/// Interpretation mode for path operators.
///
/// Roles are plain integers because every restore advances a nonzero role by
/// one; the gaps between the constants absorb those increments.
mod role {
    pub const IDLE: i32 = 0;
    /// Plot-area border. One restore later the role is the beat-marker grid.
    pub const BORDER: i32 = 1;
    pub const BEAT_GRID: i32 = 2;
    /// Vertical grid. One restore later the role is the trace grid.
    pub const VERTICAL_GRID: i32 = 11;
    pub const TRACE_GRID: i32 = 12;
    pub const CALIBRATION: i32 = 21;
    pub const TRACE: i32 = 22;
    /// Everything at or above this is a beat marker: each marker sits in its
    /// own save/restore pair, so the role keeps climbing as markers close.
    pub const BEAT_MARKER: i32 = 23;
}

/// Everything recovered by one scan, already rescaled to physical units.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOutcome {
    /// Sample timestamps in seconds.
    pub times: Vec<f64>,
    /// Sample amplitudes in mV.
    pub amplitudes: Vec<f64>,
    /// Beat-marker timestamps in seconds.
    pub beats: Vec<f64>,
    pub stats: ScanStats,
}

/// Diagnostic counters from a completed scan.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScanStats {
    /// Number of horizontally adjacent chunks the trace was drawn as.
    pub subtraces: usize,
    /// Baselines recorded for the beat-marker grid. Not consumed by the
    /// extraction; kept as a diagnostic.
    pub beat_grid_lines: usize,
    /// Text objects scanned over (and skipped) on the page.
    pub text_objects: usize,
    /// Width of the plot area in transform-space units.
    pub time_width: Option<f64>,
}

/// All mutable state of one scan. Created fresh per document, owned
/// exclusively by the scan, discarded when it finishes.
#[derive(Debug, Default)]
struct ParseContext {
    /// Top-level document region: incremented on each save at depth 0.
    stage: u32,
    depth: u32,
    role: i32,
    in_text: bool,
    text_objects: usize,

    transform: GraphicsMap,
    saved: Vec<GraphicsMap>,

    /// Index of the subtrace currently being drawn, None before the first
    /// trace width declaration.
    subtrace: Option<usize>,
    trace_origins: Vec<f64>,
    beat_grid_origins: Vec<f64>,

    border_x_min: Option<f64>,
    border_x_max: Option<f64>,
    time_width: Option<f64>,
    /// Transform-space x treated as time zero for the current subtrace.
    time_cursor: Option<f64>,

    times: Vec<f64>,
    amplitudes: Vec<f64>,
    beats: Vec<f64>,

    /// Operands collected since the last operator.
    operands: Vec<f64>,
}

impl ParseContext {
    fn new() -> Self {
        Self::default()
    }

    /// Feed a token stream through the context.
    fn run<'a, I>(&mut self, tokens: I) -> Result<(), ScanError>
    where
        I: IntoIterator<Item = Token<'a>>,
    {
        for (at, token) in tokens.into_iter().enumerate() {
            match token {
                Token::Integer(v) => self.operands.push(v as f64),
                Token::Real(v) => self.operands.push(v),
                Token::Operator(op) => {
                    self.apply(op, at)?;
                    self.operands.clear();
                }
            }
        }
        Ok(())
    }

    fn apply(&mut self, op: &str, at: usize) -> Result<(), ScanError> {
        match op {
            "q" => self.save(),
            "Q" => self.restore(at)?,
            "BT" => self.in_text = true,
            "ET" => {
                if self.in_text {
                    self.text_objects += 1;
                    self.in_text = false;
                }
            }
            "cm" => self.concat_matrix(at)?,
            "w" => self.set_line_width(at)?,
            "m" => self.move_to(at)?,
            "l" => self.line_to(at)?,
            // h, S, f, G, g, cs, scn, TJ and everything else is decoration.
            _ => {}
        }
        Ok(())
    }

    fn save(&mut self) {
        self.saved
            .push(std::mem::replace(&mut self.transform, GraphicsMap::identity()));
        if self.depth == 0 {
            self.stage += 1;
            debug!("entering stage {}", self.stage);
        }
        self.depth += 1;
    }

    fn restore(&mut self, at: usize) -> Result<(), ScanError> {
        self.transform = self.saved.pop().ok_or(ScanError::Structural {
            at,
            reason: "restore without a matching save",
        })?;
        // Closing a block moves the classifier to the next sibling object.
        if self.role != role::IDLE {
            self.role += 1;
        }
        self.depth -= 1;
        Ok(())
    }

    fn concat_matrix(&mut self, at: usize) -> Result<(), ScanError> {
        if self.operands.len() != 6 {
            return Err(ScanError::MalformedOperand {
                op: "cm",
                expected: 6,
                found: self.operands.len(),
                at,
            });
        }
        if self.operands[1] != 0.0 || self.operands[2] != 0.0 {
            return Err(ScanError::UnsupportedTransform { at });
        }
        self.transform = GraphicsMap::new(
            self.operands[0],
            self.operands[3],
            self.operands[4],
            self.operands[5],
        );
        Ok(())
    }

    fn set_line_width(&mut self, at: usize) -> Result<(), ScanError> {
        if self.operands.len() != 1 {
            return Err(ScanError::MalformedOperand {
                op: "w",
                expected: 1,
                found: self.operands.len(),
                at,
            });
        }
        let w = self.operands[0];
        let selected = match self.stage {
            2 => {
                if w == 0.4 {
                    // Plot border, followed by the beat-marker grid
                    Some(role::BORDER)
                } else if w == 0.3 {
                    // Vertical grid, followed by the trace grid
                    Some(role::VERTICAL_GRID)
                } else {
                    None
                }
            }
            3 => {
                if w == 1.5 {
                    // Calibration pulse: 1 mV for 0.2 s
                    Some(role::CALIBRATION)
                } else if w == 0.4 {
                    self.subtrace = Some(self.subtrace.map_or(0, |i| i + 1));
                    Some(role::TRACE)
                } else if w == 0.6 {
                    Some(role::BEAT_MARKER)
                } else {
                    None
                }
            }
            _ => None,
        };
        if let Some(selected) = selected {
            self.role = selected;
            debug!("width {} at stage {} selects role {}", w, self.stage, selected);
        }
        Ok(())
    }

    /// Check for exactly two pending operands and map them through the
    /// current transform.
    fn point_operands(&self, op: &'static str, at: usize) -> Result<(f64, f64), ScanError> {
        if self.operands.len() != 2 {
            return Err(ScanError::MalformedOperand {
                op,
                expected: 2,
                found: self.operands.len(),
                at,
            });
        }
        Ok(self.transform.map(self.operands[0], self.operands[1]))
    }

    fn move_to(&mut self, at: usize) -> Result<(), ScanError> {
        let (x, y) = self.point_operands("m", at)?;
        if self.role == role::BORDER {
            self.border_x_min = Some(x);
        } else if self.role == role::BEAT_GRID {
            self.beat_grid_origins.push(y);
        } else if self.role == role::TRACE_GRID {
            self.trace_origins.push(y);
        } else if self.role == role::TRACE {
            let origin = self.trace_origin(at)?;
            match self.time_cursor {
                None => {
                    self.time_cursor = Some(x);
                    self.times.push(0.0);
                }
                Some(cursor) => {
                    // A later move under the trace role starts the next
                    // subtrace: shift the time origin left by one plot width
                    // so time keeps increasing across chunks.
                    let width = self.time_width.ok_or(ScanError::Structural {
                        at,
                        reason: "subtrace continuation before the border width is known",
                    })?;
                    let cursor = cursor - width;
                    self.time_cursor = Some(cursor);
                    self.times.push(x - cursor);
                }
            }
            self.amplitudes.push(y - origin);
        } else if self.role >= role::BEAT_MARKER {
            let cursor = self.time_cursor.ok_or(ScanError::Structural {
                at,
                reason: "beat marker before any trace sample",
            })?;
            self.beats.push(x - cursor);
        }
        Ok(())
    }

    fn line_to(&mut self, at: usize) -> Result<(), ScanError> {
        let (x, y) = self.point_operands("l", at)?;
        if self.role == role::BORDER {
            if self.time_width.is_none() {
                let x_min = self.border_x_min.ok_or(ScanError::Structural {
                    at,
                    reason: "border line before the border move",
                })?;
                self.border_x_max = Some(x);
                self.time_width = Some(x - x_min);
            }
        } else if self.role == role::TRACE {
            let origin = self.trace_origin(at)?;
            let cursor = self.time_cursor.ok_or(ScanError::Structural {
                at,
                reason: "trace line before the trace move",
            })?;
            self.times.push(x - cursor);
            self.amplitudes.push(y - origin);
        }
        // Beat-marker line segments draw the tick itself and carry no data.
        Ok(())
    }

    /// Baseline y of the subtrace currently being drawn. The grid pass must
    /// have recorded it already; anything else means the template's
    /// grid-before-trace ordering is broken.
    fn trace_origin(&self, at: usize) -> Result<f64, ScanError> {
        let index = self.subtrace.ok_or(ScanError::Structural {
            at,
            reason: "trace stroke before any trace width declaration",
        })?;
        self.trace_origins
            .get(index)
            .copied()
            .ok_or(ScanError::Structural {
                at,
                reason: "trace stroke before its grid baseline was recorded",
            })
    }

    /// Rescale the accumulated point-space values into seconds and mV.
    /// Runs exactly once, at the end of a successful scan.
    fn finish(mut self, options: &ScanOptions) -> ScanOutcome {
        debug!(
            "plot area x {:?}..{:?}, {} trace baselines",
            self.border_x_min,
            self.border_x_max,
            self.trace_origins.len()
        );

        let time_factor = options.points_to_mm / options.time_scale;
        let amplitude_factor = options.points_to_mm / options.amplitude_scale;

        for t in &mut self.times {
            *t *= time_factor;
        }
        for a in &mut self.amplitudes {
            *a *= amplitude_factor;
        }
        for b in &mut self.beats {
            *b *= time_factor;
        }

        let stats = ScanStats {
            subtraces: self.subtrace.map_or(0, |i| i + 1),
            beat_grid_lines: self.beat_grid_origins.len(),
            text_objects: self.text_objects,
            time_width: self.time_width,
        };

        ScanOutcome {
            times: self.times,
            amplitudes: self.amplitudes,
            beats: self.beats,
            stats,
        }
    }
}

/// Run the structural scan over a token stream and rescale the result to
/// physical units.
pub fn scan<'a, I>(tokens: I, options: &ScanOptions) -> Result<ScanOutcome, ScanError>
where
    I: IntoIterator<Item = Token<'a>>,
{
    let mut ctx = ParseContext::new();
    ctx.run(tokens)?;
    Ok(ctx.finish(options))
}

/// Tokenize a decoded content stream and scan it.
pub fn scan_content(stream: &str, options: &ScanOptions) -> Result<ScanOutcome, ScanError> {
    scan(tokenize(stream), options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(ctx: &mut ParseContext, stream: &str) -> Result<(), ScanError> {
        ctx.run(tokenize(stream))
    }

    #[test]
    fn balanced_save_restore_empties_the_stack() {
        let mut ctx = ParseContext::new();
        run(&mut ctx, "q q Q Q q Q").unwrap();
        assert!(ctx.saved.is_empty());
        assert_eq!(ctx.depth, 0);
        assert_eq!(ctx.stage, 2);
    }

    #[test]
    fn restore_without_save_is_a_structural_error() {
        let err = scan_content("Q", &ScanOptions::default()).unwrap_err();
        assert!(matches!(err, ScanError::Structural { at: 0, .. }));
    }

    #[test]
    fn sheared_matrix_is_rejected() {
        let err = scan_content("1 0.1 0 0 5 5 cm", &ScanOptions::default()).unwrap_err();
        assert_eq!(err, ScanError::UnsupportedTransform { at: 6 });
    }

    #[test]
    fn rotated_matrix_is_rejected() {
        let err = scan_content("0 1 -1 0 0 0 cm", &ScanOptions::default()).unwrap_err();
        assert_eq!(err, ScanError::UnsupportedTransform { at: 6 });
    }

    #[test]
    fn axis_aligned_matrix_is_accepted() {
        let mut ctx = ParseContext::new();
        run(&mut ctx, "2 0 0 -1 10 700 cm").unwrap();
        assert_eq!(ctx.transform, GraphicsMap::new(2.0, -1.0, 10.0, 700.0));
    }

    #[test]
    fn matrix_with_wrong_operand_count_is_malformed() {
        let err = scan_content("1 0 0 -1 0 cm", &ScanOptions::default()).unwrap_err();
        assert_eq!(
            err,
            ScanError::MalformedOperand {
                op: "cm",
                expected: 6,
                found: 5,
                at: 5,
            }
        );
    }

    #[test]
    fn move_with_one_operand_is_malformed() {
        let err = scan_content("5 m", &ScanOptions::default()).unwrap_err();
        assert_eq!(
            err,
            ScanError::MalformedOperand {
                op: "m",
                expected: 2,
                found: 1,
                at: 1,
            }
        );
    }

    #[test]
    fn width_with_wrong_operand_count_is_malformed() {
        let err = scan_content("0.4 0.6 w", &ScanOptions::default()).unwrap_err();
        assert_eq!(
            err,
            ScanError::MalformedOperand {
                op: "w",
                expected: 1,
                found: 2,
                at: 2,
            }
        );
    }

    #[test]
    fn restores_advance_the_role_by_one() {
        let mut ctx = ParseContext::new();
        // Reach stage 2, then declare the border width two blocks deep.
        run(&mut ctx, "q Q q q q 0.4 w").unwrap();
        assert_eq!(ctx.role, role::BORDER);

        run(&mut ctx, "Q").unwrap();
        assert_eq!(ctx.role, role::BEAT_GRID);
        run(&mut ctx, "Q").unwrap();
        assert_eq!(ctx.role, 3);
    }

    #[test]
    fn width_declaration_overrides_the_role_directly() {
        let mut ctx = ParseContext::new();
        run(&mut ctx, "q Q q q q 0.4 w Q Q").unwrap();
        assert_eq!(ctx.role, 3);
        // A new declaration wins regardless of the prior value.
        run(&mut ctx, "0.3 w").unwrap();
        assert_eq!(ctx.role, role::VERTICAL_GRID);
    }

    #[test]
    fn unknown_widths_leave_the_role_unchanged() {
        let mut ctx = ParseContext::new();
        run(&mut ctx, "q Q q 2.0 w").unwrap();
        assert_eq!(ctx.role, role::IDLE);
        // Stage 1 widths never classify anything.
        let mut ctx = ParseContext::new();
        run(&mut ctx, "q 0.4 w").unwrap();
        assert_eq!(ctx.role, role::IDLE);
    }

    #[test]
    fn border_block_records_the_plot_width() {
        let mut ctx = ParseContext::new();
        run(&mut ctx, "q Q q 0.4 w q 1 0 0 -1 0 0 cm 0 0 m 100 0 l S Q Q").unwrap();
        assert_eq!(ctx.border_x_min, Some(0.0));
        assert_eq!(ctx.border_x_max, Some(100.0));
        assert_eq!(ctx.time_width, Some(100.0));
    }

    #[test]
    fn border_width_is_taken_from_the_first_line_only() {
        let mut ctx = ParseContext::new();
        run(
            &mut ctx,
            "q Q q 0.4 w q 1 0 0 -1 0 0 cm 10 0 m 110 0 l 110 50 l 10 50 l h S Q Q",
        )
        .unwrap();
        assert_eq!(ctx.time_width, Some(100.0));
        assert_eq!(ctx.border_x_max, Some(110.0));
    }

    #[test]
    fn time_is_continuous_across_subtraces() {
        let mut ctx = ParseContext::new();
        ctx.time_width = Some(100.0);
        ctx.trace_origins = vec![40.0, 40.0];
        ctx.subtrace = Some(0);
        ctx.role = role::TRACE;

        run(&mut ctx, "10 50 m").unwrap();
        assert_eq!(ctx.times, vec![0.0]);
        assert_eq!(ctx.time_cursor, Some(10.0));

        // The next subtrace starts at the same x; its samples must continue
        // the time axis rather than restart it.
        ctx.subtrace = Some(1);
        run(&mut ctx, "10 50 m").unwrap();
        assert_eq!(ctx.time_cursor, Some(-90.0));
        assert_eq!(ctx.times, vec![0.0, 100.0]);
        assert!(ctx.times[1] > ctx.times[0]);
    }

    #[test]
    fn amplitudes_are_baseline_subtracted() {
        let mut ctx = ParseContext::new();
        ctx.trace_origins = vec![50.0, 80.0];
        ctx.subtrace = Some(1);
        ctx.role = role::TRACE;
        ctx.time_cursor = Some(0.0);

        run(&mut ctx, "10 75 l").unwrap();
        assert_eq!(ctx.amplitudes, vec![-5.0]);
    }

    #[test]
    fn trace_before_its_baseline_is_a_structural_error() {
        let mut ctx = ParseContext::new();
        ctx.trace_origins = vec![50.0];
        ctx.subtrace = Some(1);
        ctx.role = role::TRACE;
        let err = run(&mut ctx, "10 75 m").unwrap_err();
        assert!(matches!(err, ScanError::Structural { at: 2, .. }));
    }

    #[test]
    fn beat_marker_role_is_sticky_across_blocks() {
        let mut ctx = ParseContext::new();
        ctx.role = role::BEAT_MARKER;
        ctx.time_cursor = Some(10.0);

        run(&mut ctx, "q 15 0 m 15 5 l S Q q 35 0 m 35 5 l S Q").unwrap();
        assert!(ctx.role >= role::BEAT_MARKER);
        // Both markers landed despite the role advancing past 23.
        assert_eq!(ctx.beats, vec![5.0, 25.0]);
    }

    #[test]
    fn beat_marker_lines_are_not_sampled() {
        let mut ctx = ParseContext::new();
        ctx.role = role::BEAT_MARKER;
        ctx.time_cursor = Some(0.0);
        run(&mut ctx, "15 0 m 15 5 l").unwrap();
        assert_eq!(ctx.beats.len(), 1);
        assert!(ctx.times.is_empty());
    }

    #[test]
    fn beat_marker_before_any_trace_is_a_structural_error() {
        let mut ctx = ParseContext::new();
        ctx.role = role::BEAT_MARKER;
        let err = run(&mut ctx, "15 0 m").unwrap_err();
        assert!(matches!(err, ScanError::Structural { at: 2, .. }));
    }

    #[test]
    fn calibration_pulse_is_consumed_without_output() {
        let mut ctx = ParseContext::new();
        ctx.role = role::CALIBRATION;
        run(&mut ctx, "12 25 m 12 15 l 17 15 l S").unwrap();
        assert!(ctx.times.is_empty());
        assert!(ctx.amplitudes.is_empty());
        assert!(ctx.beats.is_empty());
    }

    #[test]
    fn finalize_rescales_by_constant_factors() {
        let mut ctx = ParseContext::new();
        ctx.times = vec![0.0, 10.0, 20.0];
        ctx.amplitudes = vec![5.0, -5.0, 0.0];
        ctx.beats = vec![4.0, 16.0];

        let options = ScanOptions::default();
        let outcome = ctx.finish(&options);

        let time_factor = (25.4 / 72.0) / 25.0;
        let amplitude_factor = (25.4 / 72.0) / 10.0;
        for (got, raw) in outcome.times.iter().zip([0.0, 10.0, 20.0]) {
            assert_eq!(*got, raw * time_factor);
        }
        for (got, raw) in outcome.amplitudes.iter().zip([5.0, -5.0, 0.0]) {
            assert_eq!(*got, raw * amplitude_factor);
        }
        for (got, raw) in outcome.beats.iter().zip([4.0, 16.0]) {
            assert_eq!(*got, raw * time_factor);
        }
    }

    /// A miniature report with the full template structure: three stages,
    /// border, grids, calibration pulse, two subtraces and three markers.
    const MINI_REPORT: &str = "\
        q Q \
        q \
        q BT (Recorded) Tj ET Q \
        0.4 w q 1 0 0 -1 0 0 cm 10 0 m 110 0 l 110 50 l 10 50 l h S Q \
        q 1 0 0 -1 0 0 cm 10 5 m 110 5 l S Q \
        0.3 w q 1 0 0 -1 0 0 cm 20 0 m 20 50 l S Q \
        q 1 0 0 -1 0 0 cm 10 20 m 110 20 l S 10 40 m 110 40 l S Q \
        Q \
        q \
        1.5 w q 1 0 0 -1 0 0 cm 12 25 m 12 15 l 17 15 l 17 25 l S Q \
        0.4 w q 1 0 0 -1 0 0 cm 10 25 m 20 22 l 30 28 l S Q \
        0.6 w q 1 0 0 -1 0 35 cm 15 0 m 15 5 l S Q \
        q 1 0 0 -1 0 35 cm 25 0 m 25 5 l S Q \
        0.4 w q 1 0 0 -1 0 0 cm 10 45 m 20 41 l S Q \
        0.6 w q 1 0 0 -1 0 35 cm 30 0 m 30 5 l S Q \
        Q";

    #[test]
    fn mini_report_end_to_end() {
        let options = ScanOptions::default();
        let outcome = scan_content(MINI_REPORT, &options).unwrap();

        let time_factor = options.points_to_mm / options.time_scale;
        let amplitude_factor = options.points_to_mm / options.amplitude_scale;

        // Subtrace 0 starts at x=10 (time zero); subtrace 1 continues at
        // 10 - (-90) = 100 transform-space units.
        let raw_times = [0.0, 10.0, 20.0, 100.0, 110.0];
        let raw_amplitudes = [-5.0, -2.0, -8.0, -5.0, -1.0];
        let raw_beats = [5.0, 15.0, 120.0];

        assert_eq!(outcome.times.len(), raw_times.len());
        assert_eq!(outcome.amplitudes.len(), raw_amplitudes.len());
        assert_eq!(outcome.beats.len(), raw_beats.len());
        for (got, raw) in outcome.times.iter().zip(raw_times) {
            assert_eq!(*got, raw * time_factor);
        }
        for (got, raw) in outcome.amplitudes.iter().zip(raw_amplitudes) {
            assert_eq!(*got, raw * amplitude_factor);
        }
        for (got, raw) in outcome.beats.iter().zip(raw_beats) {
            assert_eq!(*got, raw * time_factor);
        }

        assert_eq!(outcome.stats.subtraces, 2);
        assert_eq!(outcome.stats.beat_grid_lines, 1);
        assert_eq!(outcome.stats.text_objects, 1);
        assert_eq!(outcome.stats.time_width, Some(100.0));
    }

    #[test]
    fn mini_report_is_balanced() {
        let mut ctx = ParseContext::new();
        run(&mut ctx, MINI_REPORT).unwrap();
        assert!(ctx.saved.is_empty());
        assert_eq!(ctx.depth, 0);
        assert_eq!(ctx.stage, 3);
    }
}
