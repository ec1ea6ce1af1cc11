use crate::{
    segmenter::{Candidate, MAX_SEGMENT_SECONDS, sweep},
    types::{Segment, VolumePoint},
};

/// Thresholds for the duration + volume-change density policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensityParams {
    pub min_duration: f64,
    pub min_volume_changes: f64,
    /// Volume changes per second
    pub min_change_density: f64,
}

impl Default for DensityParams {
    fn default() -> Self {
        Self {
            min_duration: 2.0,
            min_volume_changes: 1.0,
            min_change_density: 0.1,
        }
    }
}

fn duration_score(duration: f64) -> f64 {
    if (4.0..=8.0).contains(&duration) {
        1.0
    } else if (2.0..=12.0).contains(&duration) {
        0.7
    } else {
        0.3
    }
}

/// Level changes among the points strictly between the opening and closing point.
fn volume_changes(points: &[VolumePoint], candidate: &Candidate) -> u32 {
    let interior = candidate.open + 1..candidate.close;
    interior
        .filter(|&i| points[i].volume != points[i - 1].volume)
        .count() as u32
}

fn accepts(params: &DensityParams, duration: f64, changes: u32) -> bool {
    let changes = f64::from(changes);
    duration >= params.min_duration
        && duration <= MAX_SEGMENT_SECONDS
        && changes >= params.min_volume_changes
        && changes / duration >= params.min_change_density
}

pub(crate) fn detect(points: &[VolumePoint], params: &DensityParams) -> Vec<Segment> {
    let times: Vec<f64> = points.iter().map(|p| p.time).collect();

    sweep(&times, |i| points[i].volume > 0.0)
        .into_iter()
        .filter_map(|candidate| {
            let duration = candidate.duration();
            let changes = volume_changes(points, &candidate);
            if !accepts(params, duration, changes) {
                return None;
            }

            let confidence =
                0.6 * duration_score(duration) + 0.4 * (f64::from(changes) / 8.0).min(1.0);
            Some(Segment::new(
                candidate.start,
                candidate.end,
                confidence,
                0.5,
                changes,
            ))
        })
        .collect()
}
