//! Approximate progress estimation from engine output.
//!
//! The transformation engine has no structured progress API, so this is a
//! coarse heuristic and not a real percentage: a run that is
//! confirmed started sits at [`PROGRESS_STARTED`], every recognised activity
//! line adds [`PROGRESS_STEP`], and the estimate is clamped at
//! [`PROGRESS_CEILING`]. Only a confirmed success reaches
//! [`PROGRESS_COMPLETE`].

/// Progress reported once the run is accepted but not yet measurable.
pub const PROGRESS_STARTED: u8 = 10;

/// Increment per recognised activity line.
pub const PROGRESS_STEP: u8 = 10;

/// Highest value the estimate can reach before confirmed completion.
pub const PROGRESS_CEILING: u8 = 90;

/// Progress of a successfully completed job.
pub const PROGRESS_COMPLETE: u8 = 100;

/// Marker that identifies an activity line (matched case-insensitively).
const ACTIVITY_MARKER: &str = "processing";

/// Whether an engine output line signals forward progress.
pub fn is_activity_line(line: &str) -> bool {
    line.to_ascii_lowercase().contains(ACTIVITY_MARKER)
}

/// Running estimate for a single run. Never decreases.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressEstimator {
    current: u8,
}

impl ProgressEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u8 {
        self.current
    }

    /// The run is confirmed started.
    pub fn start(&mut self) -> u8 {
        self.current = self.current.max(PROGRESS_STARTED);
        self.current
    }

    /// Feed one output line. Returns the new estimate if it moved.
    pub fn observe(&mut self, line: &str) -> Option<u8> {
        if !is_activity_line(line) || self.current >= PROGRESS_CEILING {
            return None;
        }
        self.current = self
            .current
            .saturating_add(PROGRESS_STEP)
            .min(PROGRESS_CEILING);
        Some(self.current)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
