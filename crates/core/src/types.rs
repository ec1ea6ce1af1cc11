use serde::{Deserialize, Serialize};

use crate::{
    error::{ApplauseError, Result},
    format::{format_timestamp, parse_timestamp},
};

/// Tag prefix marking a free-form label typed by the user rather than a roster name.
pub const CUSTOM_LABEL_PREFIX: &str = "custom:";

/// One detector transition: volume 0 opens a silence, 1 ends it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumePoint {
    pub time: f64,
    pub volume: f64,
}

impl VolumePoint {
    pub fn new(time: f64, volume: f64) -> Self {
        Self { time, volume }
    }
}

fn default_selected() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start_time: String,
    pub end_time: String,
    pub duration: String,
    pub confidence: f64,
    pub rhythm_score: f64,
    pub transient_count: u32,
    #[serde(default = "default_selected")]
    pub selected: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Segment {
    pub fn new(
        start: f64,
        end: f64,
        confidence: f64,
        rhythm_score: f64,
        transient_count: u32,
    ) -> Self {
        Self {
            start_time: format_timestamp(start),
            end_time: format_timestamp(end),
            duration: format_timestamp(end - start),
            confidence: confidence.clamp(0.0, 1.0),
            rhythm_score: rhythm_score.clamp(0.0, 1.0),
            transient_count,
            selected: true,
            tags: Vec::new(),
        }
    }

    pub fn start_seconds(&self) -> Result<f64> {
        parse_timestamp(&self.start_time)
    }

    pub fn end_seconds(&self) -> Result<f64> {
        parse_timestamp(&self.end_time)
    }

    pub fn duration_seconds(&self) -> Result<f64> {
        parse_timestamp(&self.duration)
    }

    /// Move the segment to new bounds (drag editing) and re-derive its duration.
    pub fn set_bounds(&mut self, start: f64, end: f64) -> Result<()> {
        if !start.is_finite() || !end.is_finite() || start < 0.0 || end <= start {
            return Err(ApplauseError::InvalidBounds { start, end });
        }
        // Both bounds must not collapse onto the same MM:SS second.
        if end.trunc() <= start.trunc() {
            return Err(ApplauseError::InvalidBounds { start, end });
        }
        self.start_time = format_timestamp(start);
        self.end_time = format_timestamp(end);
        self.duration = format_timestamp(end - start);
        Ok(())
    }

    /// Appends `tag` unless the segment already carries it. Returns whether it was added.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.tags.iter().any(|t| t == tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag.trim());
        self.tags.len() != before
    }

    /// The name used for clip naming: first tag, custom marker stripped.
    pub fn first_tag_label(&self) -> Option<&str> {
        let first = self.tags.first()?;
        let label = first
            .strip_prefix(CUSTOM_LABEL_PREFIX)
            .unwrap_or(first)
            .trim();
        (!label.is_empty()).then_some(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoAnalysis {
    pub filename: String,
    #[serde(rename = "applause_segments", default)]
    pub segments: Vec<Segment>,
}

impl VideoAnalysis {
    pub fn new(filename: impl Into<String>, segments: Vec<Segment>) -> Self {
        Self {
            filename: filename.into(),
            segments,
        }
    }

    /// Segment by 1-based index, as shown to the user.
    pub fn segment_mut(&mut self, index: usize) -> Result<&mut Segment> {
        let filename = self.filename.clone();
        index
            .checked_sub(1)
            .and_then(|i| self.segments.get_mut(i))
            .ok_or(ApplauseError::SegmentNotFound { filename, index })
    }

    pub fn selected_count(&self) -> usize {
        self.segments.iter().filter(|s| s.selected).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionPlanItem {
    pub source_filename: String,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    pub output_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> VideoAnalysis {
        let mut tagged = Segment::new(63.4, 69.9, 0.82, 0.5, 7);
        tagged.tags = vec!["custom:Guest Speaker".into(), "Tom".into()];
        let mut dropped = Segment::new(300.0, 304.2, 0.41, 0.3, 3);
        dropped.selected = false;
        VideoAnalysis::new("IMG_2333.MOV", vec![tagged, dropped])
    }

    #[test]
    fn test_analysis_json_round_trip() {
        let analysis = sample();
        let json = serde_json::to_string_pretty(&analysis).unwrap();
        assert!(json.contains("\"applause_segments\""));
        assert!(json.contains("\"rhythm_score\""));

        let back: VideoAnalysis = serde_json::from_str(&json).unwrap();
        assert_eq!(back, analysis);
    }

    #[test]
    fn test_missing_selected_defaults_to_true() {
        let json = r#"{
            "filename": "a.mp4",
            "applause_segments": [{
                "start_time": "00:03", "end_time": "00:09", "duration": "00:06",
                "confidence": 0.7, "rhythm_score": 0.5, "transient_count": 2
            }]
        }"#;
        let analysis: VideoAnalysis = serde_json::from_str(json).unwrap();
        assert!(analysis.segments[0].selected);
        assert!(analysis.segments[0].tags.is_empty());
    }

    #[test]
    fn test_set_bounds_rederives_duration() {
        let mut seg = Segment::new(3.5, 9.5, 0.7, 0.5, 2);
        seg.set_bounds(65.0, 130.2).unwrap();
        assert_eq!(seg.start_time, "01:05");
        assert_eq!(seg.end_time, "02:10");
        assert_eq!(seg.duration, "01:05");
    }

    #[test]
    fn test_set_bounds_rejects_inverted_range() {
        let mut seg = Segment::new(3.5, 9.5, 0.7, 0.5, 2);
        assert!(matches!(
            seg.set_bounds(10.0, 10.0),
            Err(ApplauseError::InvalidBounds { .. })
        ));
        assert!(seg.set_bounds(10.2, 10.7).is_err());
        assert_eq!(seg.start_time, "00:03");
    }

    #[test]
    fn test_first_tag_label_strips_custom_marker() {
        let analysis = sample();
        assert_eq!(analysis.segments[0].first_tag_label(), Some("Guest Speaker"));
        assert_eq!(analysis.segments[1].first_tag_label(), None);

        let mut seg = Segment::new(1.0, 4.0, 0.5, 0.5, 1);
        seg.tags.push("custom:  ".into());
        assert_eq!(seg.first_tag_label(), None);
    }

    #[test]
    fn test_tag_editing() {
        let mut seg = Segment::new(1.0, 4.0, 0.5, 0.5, 1);
        assert!(seg.add_tag("Alice"));
        assert!(!seg.add_tag("Alice"));
        assert!(seg.add_tag("Bob"));
        assert_eq!(seg.tags, vec!["Alice", "Bob"]);
        assert!(seg.remove_tag("Alice"));
        assert_eq!(seg.first_tag_label(), Some("Bob"));
    }

    #[test]
    fn test_segment_mut_is_one_based() {
        let mut analysis = sample();
        assert_eq!(analysis.segment_mut(2).unwrap().start_time, "05:00");
        assert!(analysis.segment_mut(0).is_err());
        assert!(analysis.segment_mut(3).is_err());
    }
}
