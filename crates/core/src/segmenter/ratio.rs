use crate::{
    segmenter::{Candidate, MAX_SEGMENT_SECONDS, sweep},
    sensitivity::SensitivityParams,
    types::{Segment, VolumePoint},
};

const MIN_APPLAUSE_RATIO: f64 = 0.6;
const PEAK_ENERGY: f64 = 0.5;
const MIN_RHYTHM_SAMPLES: usize = 10;

/// Placeholder feature frame derived from one transition point.
///
/// These values are arithmetic transforms of the silence/non-silence level,
/// not measurements of the audio signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioFrame {
    pub time: f64,
    pub energy: f64,
    pub zcr: f64,
    pub spectral_flux: f64,
    pub volume: f64,
}

impl AudioFrame {
    /// At least two of the three features must reach their threshold.
    pub fn is_applause(&self, params: &SensitivityParams) -> bool {
        let hits = [
            self.energy >= params.min_energy,
            self.zcr >= params.min_zcr,
            self.spectral_flux >= params.min_spectral_flux,
        ];
        hits.iter().filter(|&&hit| hit).count() >= 2
    }
}

pub fn build_frames(points: &[VolumePoint]) -> Vec<AudioFrame> {
    points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let volume = point.volume;
            let zcr = if volume == 0.0 { 0.0 } else { 0.1 + 0.2 * volume };
            let spectral_flux = match i {
                0 => 0.0,
                _ => (volume - points[i - 1].volume).abs() * 0.5,
            };
            AudioFrame {
                time: point.time,
                energy: volume * 0.8 + 0.1,
                zcr,
                spectral_flux,
                volume,
            }
        })
        .collect()
}

fn duration_score(duration: f64) -> f64 {
    if (3.0..=8.0).contains(&duration) {
        1.0
    } else if (2.0..=12.0).contains(&duration) {
        0.7
    } else {
        0.3
    }
}

/// `max(0, 1 - 2 * coefficient of variation)` of the window energies.
fn energy_consistency(frames: &[AudioFrame]) -> f64 {
    if frames.len() <= 1 {
        return 0.5;
    }
    let n = frames.len() as f64;
    let mean = frames.iter().map(|f| f.energy).sum::<f64>() / n;
    if mean == 0.0 {
        return 0.5;
    }
    let variance = frames
        .iter()
        .map(|f| (f.energy - mean).powi(2))
        .sum::<f64>()
        / n;
    (1.0 - 2.0 * variance.sqrt() / mean).max(0.0)
}

/// Share of interior energy peaks above 0.5 among frames inside `[start, end]`.
fn rhythm_score(frames: &[AudioFrame], start: f64, end: f64) -> f64 {
    let energies: Vec<f64> = frames
        .iter()
        .filter(|f| f.time >= start && f.time <= end)
        .map(|f| f.energy)
        .collect();

    if energies.len() < MIN_RHYTHM_SAMPLES {
        return 0.5;
    }

    let peaks = energies
        .windows(3)
        .filter(|w| w[1] > PEAK_ENERGY && w[1] > w[0] && w[1] > w[2])
        .count();
    (peaks as f64 / 10.0).min(1.0)
}

fn evaluate(
    frames: &[AudioFrame],
    candidate: &Candidate,
    params: &SensitivityParams,
) -> Option<Segment> {
    let duration = candidate.duration();
    if duration < params.min_duration || duration > MAX_SEGMENT_SECONDS {
        return None;
    }

    // The closing frame belongs to the silence that ended the run, unless the
    // stream ran out first.
    let counted = if candidate.trailing {
        &frames[candidate.open..=candidate.close]
    } else {
        &frames[candidate.open..candidate.close]
    };
    let total = counted.len();
    let applause = counted.iter().filter(|f| f.is_applause(params)).count();
    if total == 0 {
        return None;
    }
    let ratio = applause as f64 / total as f64;
    if ratio < MIN_APPLAUSE_RATIO {
        return None;
    }

    let consistency = energy_consistency(&frames[candidate.open..=candidate.close]);
    let confidence = 0.3 * duration_score(duration) + 0.4 * ratio + 0.3 * consistency;
    let rhythm = rhythm_score(frames, candidate.start, candidate.end);

    Some(Segment::new(
        candidate.start,
        candidate.end,
        confidence,
        rhythm,
        applause as u32,
    ))
}

pub(crate) fn detect(points: &[VolumePoint], params: &SensitivityParams) -> Vec<Segment> {
    let frames = build_frames(points);
    let times: Vec<f64> = frames.iter().map(|f| f.time).collect();

    sweep(&times, |i| frames[i].is_applause(params))
        .iter()
        .filter_map(|candidate| evaluate(&frames, candidate, params))
        .collect()
}
