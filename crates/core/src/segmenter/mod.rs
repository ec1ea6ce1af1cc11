//! Segment synthesis: sweeps detector transitions into scored applause segments.
//!
//! Two accept policies share one sweep:
//!
//! * [`DetectionPolicy::Ratio`] expands every transition into a synthetic
//!   feature frame (energy, zero-crossing rate, spectral flux) and keeps
//!   candidates whose frames are mostly applause-like. The features are a
//!   deterministic placeholder derived from the binary silence signal, not DSP.
//! * [`DetectionPolicy::Density`] keeps candidates by duration and by how often
//!   the volume level changes inside them.
//!
//! A candidate opens on the first point satisfying the policy's "loud"
//! predicate and closes on the next point that does not. A candidate still
//! open when the stream ends closes at the last point's time.

mod density;
mod ratio;

pub use density::DensityParams;
pub use ratio::{AudioFrame, build_frames};

use tracing::debug;

use crate::{
    sensitivity::SensitivityParams,
    types::{Segment, VolumePoint},
};

/// Longest run of noise still considered applause, in seconds.
pub const MAX_SEGMENT_SECONDS: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetectionPolicy {
    Density(DensityParams),
    Ratio(SensitivityParams),
}

/// A loud run found by the sweep, before the accept policy runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Candidate {
    /// Index of the opening point
    pub open: usize,
    /// Index of the closing point, or of the last point for a trailing run
    pub close: usize,
    pub start: f64,
    pub end: f64,
    /// The stream ended while the run was open
    pub trailing: bool,
}

impl Candidate {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

pub(crate) fn sweep(times: &[f64], loud: impl Fn(usize) -> bool) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    let mut open: Option<usize> = None;

    for (i, &time) in times.iter().enumerate() {
        match (open, loud(i)) {
            (None, true) => open = Some(i),
            (Some(start_idx), false) => {
                candidates.push(Candidate {
                    open: start_idx,
                    close: i,
                    start: times[start_idx],
                    end: time,
                    trailing: false,
                });
                open = None;
            }
            _ => {}
        }
    }

    if let (Some(start_idx), Some(&last)) = (open, times.last()) {
        candidates.push(Candidate {
            open: start_idx,
            close: times.len() - 1,
            start: times[start_idx],
            end: last,
            trailing: true,
        });
    }

    candidates
}

/// Turn a transition sequence into accepted, scored segments.
///
/// Deterministic: the same points and policy always give the same segments.
pub fn synthesize(points: &[VolumePoint], policy: &DetectionPolicy) -> Vec<Segment> {
    let segments: Vec<Segment> = match policy {
        DetectionPolicy::Density(params) => density::detect(points, params),
        DetectionPolicy::Ratio(params) => ratio::detect(points, params),
    }
    .into_iter()
    .filter(|seg| {
        // Sub-second runs can collapse onto a single MM:SS value.
        let keep = matches!(
            (seg.start_seconds(), seg.end_seconds()),
            (Ok(start), Ok(end)) if end > start
        );
        if !keep {
            debug!(start = %seg.start_time, "dropping segment collapsed to one second");
        }
        keep
    })
    .collect();

    debug!(
        points = points.len(),
        segments = segments.len(),
        "segment synthesis complete"
    );
    segments
}
