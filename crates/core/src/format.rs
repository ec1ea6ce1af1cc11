use crate::{
    error::{ApplauseError, Result},
    planner::REST_OF_FILE_SECONDS,
    types::{ExtractionPlanItem, VideoAnalysis},
};

/// Format seconds as MM:SS timestamp
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Parse an MM:SS timestamp (minutes may exceed two digits) back to seconds
pub fn parse_timestamp(value: &str) -> Result<f64> {
    let invalid = || ApplauseError::InvalidTimestamp(value.to_string());
    let (mins, secs) = value.trim().split_once(':').ok_or_else(invalid)?;
    let mins: u64 = mins.parse().map_err(|_| invalid())?;
    let secs: u64 = secs.parse().map_err(|_| invalid())?;
    if secs >= 60 {
        return Err(invalid());
    }
    Ok((mins * 60 + secs) as f64)
}

fn format_clip_end(seconds: f64) -> String {
    if seconds >= REST_OF_FILE_SECONDS {
        "end".to_string()
    } else {
        format_timestamp(seconds)
    }
}

/// Plain-text preview of a plan, one line per clip
pub fn format_plan_preview(plan: &[ExtractionPlanItem]) -> String {
    let mut output = String::new();
    output.push_str(&format!("{} clip(s) will be extracted:\n\n", plan.len()));

    for (i, item) in plan.iter().enumerate() {
        let length = if item.end_time >= REST_OF_FILE_SECONDS {
            "rest".to_string()
        } else {
            format_timestamp(item.duration)
        };
        output.push_str(&format!(
            "{:>3}. {} [{}-{}] ({}) -> {}\n",
            i + 1,
            item.source_filename,
            format_timestamp(item.start_time),
            format_clip_end(item.end_time),
            length,
            item.output_name
        ));
    }

    output
}

/// Human-readable summary of one video's analysis
pub fn format_analysis_summary(analysis: &VideoAnalysis) -> String {
    let mut output = String::new();
    output.push_str(&format!("## {}\n\n", analysis.filename));

    if analysis.segments.is_empty() {
        output.push_str("No applause segments detected\n");
        return output;
    }

    output.push_str(&format!(
        "Found {} applause segments:\n",
        analysis.segments.len()
    ));
    for (i, seg) in analysis.segments.iter().enumerate() {
        let mark = if seg.selected { "x" } else { " " };
        output.push_str(&format!(
            "  [{}] {:>2}. {} - {} (duration: {}, confidence: {:.2}, rhythm: {:.2}, transients: {})",
            mark,
            i + 1,
            seg.start_time,
            seg.end_time,
            seg.duration,
            seg.confidence,
            seg.rhythm_score,
            seg.transient_count
        ));
        if !seg.tags.is_empty() {
            output.push_str(&format!(" tags: {}", seg.tags.join(", ")));
        }
        output.push('\n');
    }

    output.push_str("\nSuggested split points:\n");
    for (i, seg) in analysis.segments.iter().enumerate() {
        output.push_str(&format!("  Split {}: {} (after applause ends)\n", i + 1, seg.end_time));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Segment;

    #[test]
    fn test_format_timestamp_truncates() {
        assert_eq!(format_timestamp(0.0), "00:00");
        assert_eq!(format_timestamp(9.99), "00:09");
        assert_eq!(format_timestamp(65.4), "01:05");
        assert_eq!(format_timestamp(6000.0), "100:00");
        assert_eq!(format_timestamp(-3.0), "00:00");
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("01:05").unwrap(), 65.0);
        assert_eq!(parse_timestamp("100:00").unwrap(), 6000.0);
        assert_eq!(parse_timestamp(" 00:09 ").unwrap(), 9.0);
        assert!(parse_timestamp("1:75").is_err());
        assert!(parse_timestamp("65").is_err());
        assert!(parse_timestamp("aa:bb").is_err());
    }

    #[test]
    fn test_plan_preview_marks_rest_of_file() {
        let plan = vec![
            ExtractionPlanItem {
                source_filename: "talk.mp4".into(),
                start_time: 0.0,
                end_time: 9.0,
                duration: 9.0,
                output_name: "Bob-1.mp4".into(),
            },
            ExtractionPlanItem {
                source_filename: "talk.mp4".into(),
                start_time: 3.0,
                end_time: REST_OF_FILE_SECONDS,
                duration: REST_OF_FILE_SECONDS - 3.0,
                output_name: "talk_segment_001.mp4".into(),
            },
        ];
        let preview = format_plan_preview(&plan);
        assert!(preview.starts_with("2 clip(s)"));
        assert!(preview.contains("  1. talk.mp4 [00:00-00:09] (00:09) -> Bob-1.mp4"));
        assert!(preview.contains("  2. talk.mp4 [00:03-end] (rest) -> talk_segment_001.mp4"));
    }

    #[test]
    fn test_analysis_summary_lists_split_points() {
        let mut seg = Segment::new(3.5, 9.5, 0.7, 0.5, 2);
        seg.tags.push("Alice".into());
        let summary = format_analysis_summary(&VideoAnalysis::new("a.mov", vec![seg]));
        assert!(summary.contains("Found 1 applause segments"));
        assert!(summary.contains("tags: Alice"));
        assert!(summary.contains("Split 1: 00:09"));

        let empty = format_analysis_summary(&VideoAnalysis::new("b.mov", Vec::new()));
        assert!(empty.contains("No applause segments detected"));
    }
}
