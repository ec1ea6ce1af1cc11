//! Parsing of ffmpeg `silencedetect` diagnostics into volume points.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::types::VolumePoint;

static SILENCE_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"silence_start:\s*(\S+)").expect("silence_start pattern is valid")
});

static SILENCE_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"silence_end:\s*([^\s|]+)").expect("silence_end pattern is valid")
});

fn parse_time(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|t| t.is_finite())
}

/// Scan detector output line by line. `silence_start` yields volume 0,
/// `silence_end` yields volume 1. Order is emission order, never re-sorted.
/// Lines with an unparseable timestamp are skipped.
pub fn parse_silence_output(output: &str) -> Vec<VolumePoint> {
    let mut points = Vec::new();

    for (line_no, line) in output.lines().enumerate() {
        let (raw, volume) = if let Some(caps) = SILENCE_START.captures(line) {
            (caps.get(1).map(|m| m.as_str()), 0.0)
        } else if let Some(caps) = SILENCE_END.captures(line) {
            (caps.get(1).map(|m| m.as_str()), 1.0)
        } else {
            continue;
        };

        match raw.and_then(parse_time) {
            Some(time) => points.push(VolumePoint::new(time, volume)),
            None => debug!(line = line_no + 1, text = line, "skipping malformed transition line"),
        }
    }

    points
}
