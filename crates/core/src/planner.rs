//! Turns the user's selection and tags into an ordered list of clips.
//!
//! For each video the plan is a lead-in up to the first selected applause, one
//! clip per pair of consecutive selected segments, and a final clip running to
//! the end of the file. Output names are unique across the whole plan.

use std::{
    collections::{BTreeMap, HashSet},
    path::Path,
};

use tracing::{debug, info, warn};

use crate::types::{ExtractionPlanItem, Segment, VideoAnalysis};

/// End time of the last clip of a video: "99:59:59", past any real recording.
pub const REST_OF_FILE_SECONDS: f64 = 359_999.0;

const DEFAULT_EXTENSION: &str = "mp4";

/// Session values the planner reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanContext {
    /// Video filename -> presenter named on the lead-in clip
    pub default_presenters: BTreeMap<String, String>,
    pub toastmaster: Option<String>,
}

/// Hands out output names, never the same one twice.
///
/// Names are tracked without their extension, so `Sam-1.mov` also
/// claims `Sam-1` for an `.mp4` source.
#[derive(Debug, Default)]
struct NameAllocator {
    taken: HashSet<String>,
}

impl NameAllocator {
    /// `<label>-<n>.<ext>` with the smallest free `n`.
    fn labelled(&mut self, label: &str, ext: &str) -> String {
        let label = sanitize_label(label);
        self.claim_from(1, ext, |n| format!("{label}-{n}"))
    }

    /// `<stem>_segment_<NNN>.<ext>`, bumping the number past taken names.
    fn fallback(&mut self, stem: &str, index: usize, ext: &str) -> String {
        self.claim_from(index, ext, |n| format!("{stem}_segment_{n:03}"))
    }

    fn claim_from(&mut self, first: usize, ext: &str, render: impl Fn(usize) -> String) -> String {
        let mut n = first;
        loop {
            let base = render(n);
            if !self.taken.contains(&base) {
                let name = format!("{base}.{ext}");
                self.taken.insert(base);
                return name;
            }
            n += 1;
        }
    }
}

/// Make a tag usable as a file name inside the output directory:
/// path separators and a leading dot become `_`.
fn sanitize_label(label: &str) -> String {
    let mut clean: String = label
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    if clean.starts_with('.') {
        clean.replace_range(..1, "_");
    }
    clean
}

/// A selected segment with its 1-based position among all detected segments.
struct Selected<'a> {
    index: usize,
    start: f64,
    end: f64,
    segment: &'a Segment,
}

fn selected_segments(analysis: &VideoAnalysis) -> Vec<Selected<'_>> {
    analysis
        .segments
        .iter()
        .enumerate()
        .filter(|(_, seg)| seg.selected)
        .filter_map(|(i, seg)| match (seg.start_seconds(), seg.end_seconds()) {
            (Ok(start), Ok(end)) => Some(Selected {
                index: i + 1,
                start,
                end,
                segment: seg,
            }),
            _ => {
                warn!(
                    file = %analysis.filename,
                    index = i + 1,
                    start = %seg.start_time,
                    end = %seg.end_time,
                    "skipping segment with unreadable timestamps"
                );
                None
            }
        })
        .collect()
}

fn split_filename(filename: &str) -> (String, String) {
    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
    (stem, ext)
}

fn item(source: &str, start: f64, end: f64, output_name: String) -> ExtractionPlanItem {
    ExtractionPlanItem {
        source_filename: source.to_string(),
        start_time: start,
        end_time: end,
        duration: end - start,
        output_name,
    }
}

fn plan_video(
    analysis: &VideoAnalysis,
    context: &PlanContext,
    names: &mut NameAllocator,
    plan: &mut Vec<ExtractionPlanItem>,
) {
    let selected = selected_segments(analysis);
    let (Some(first), Some(last)) = (selected.first(), selected.last()) else {
        debug!(file = %analysis.filename, "no selected segments, skipping video");
        return;
    };

    let source = analysis.filename.as_str();
    let (stem, ext) = split_filename(source);

    let presenter = context
        .default_presenters
        .get(source)
        .map(|name| name.trim())
        .filter(|name| !name.is_empty());
    let lead_in_name = match presenter {
        Some(name) => names.labelled(name, &ext),
        None => names.fallback(&stem, 1, &ext),
    };
    plan.push(item(source, 0.0, first.end, lead_in_name));

    for pair in selected.windows(2) {
        let (cur, next) = (&pair[0], &pair[1]);
        let name = match cur.segment.first_tag_label() {
            Some(label) => names.labelled(label, &ext),
            None => names.fallback(&stem, cur.index, &ext),
        };
        plan.push(item(source, cur.start, next.end, name));
    }

    let final_name = match last.segment.first_tag_label() {
        Some(label) => names.labelled(label, &ext),
        None => names.fallback(&stem, last.index, &ext),
    };
    plan.push(item(source, last.start, REST_OF_FILE_SECONDS, final_name));
}

/// Build the extraction plan for the given analyses, in input order.
pub fn build_plan(analyses: &[VideoAnalysis], context: &PlanContext) -> Vec<ExtractionPlanItem> {
    let mut names = NameAllocator::default();
    let mut plan = Vec::new();

    for analysis in analyses {
        plan_video(analysis, context, &mut names, &mut plan);
    }

    info!(
        videos = analyses.len(),
        clips = plan.len(),
        toastmaster = context.toastmaster.as_deref().unwrap_or("-"),
        "built extraction plan"
    );
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: f64, end: f64, tags: &[&str]) -> Segment {
        let mut seg = Segment::new(start, end, 0.8, 0.5, 3);
        seg.tags = tags.iter().map(|t| t.to_string()).collect();
        seg
    }

    fn names(plan: &[ExtractionPlanItem]) -> Vec<&str> {
        plan.iter().map(|i| i.output_name.as_str()).collect()
    }

    #[test]
    fn test_lead_in_uses_default_presenter() {
        let analysis = VideoAnalysis::new(
            "meeting.mov",
            vec![seg(60.0, 66.0, &["Alice"]), seg(300.0, 305.0, &[])],
        );
        let mut context = PlanContext::default();
        context
            .default_presenters
            .insert("meeting.mov".into(), "Bob".into());

        let plan = build_plan(&[analysis], &context);
        assert_eq!(
            names(&plan),
            vec!["Bob-1.mov", "Alice-1.mov", "meeting_segment_002.mov"]
        );

        assert_eq!((plan[0].start_time, plan[0].end_time), (0.0, 66.0));
        assert_eq!((plan[1].start_time, plan[1].end_time), (60.0, 305.0));
        assert_eq!(plan[1].duration, 245.0);
        assert_eq!(plan[2].start_time, 300.0);
        assert_eq!(plan[2].end_time, REST_OF_FILE_SECONDS);
    }

    #[test]
    fn test_same_tag_across_videos_is_numbered() {
        let analyses = vec![
            VideoAnalysis::new("a.mp4", vec![seg(10.0, 15.0, &["Sam"])]),
            VideoAnalysis::new("b.mp4", vec![seg(20.0, 25.0, &["Sam"])]),
        ];
        let plan = build_plan(&analyses, &PlanContext::default());
        assert_eq!(
            names(&plan),
            vec!["a_segment_001.mp4", "Sam-1.mp4", "b_segment_001.mp4", "Sam-2.mp4"]
        );
    }

    #[test]
    fn test_label_numbering_ignores_extension() {
        let analyses = vec![
            VideoAnalysis::new("a.mov", vec![seg(10.0, 15.0, &["Sam"])]),
            VideoAnalysis::new("b.mp4", vec![seg(20.0, 25.0, &["Sam"])]),
        ];
        let plan = build_plan(&analyses, &PlanContext::default());
        assert_eq!(
            names(&plan),
            vec!["a_segment_001.mov", "Sam-1.mov", "b_segment_001.mp4", "Sam-2.mp4"]
        );
    }

    #[test]
    fn test_tags_cannot_escape_output_dir() {
        let analysis = VideoAnalysis::new(
            "talk.mp4",
            vec![seg(10.0, 15.0, &["../../evil"]), seg(30.0, 35.0, &["a\\b/c"])],
        );
        let mut context = PlanContext::default();
        context
            .default_presenters
            .insert("talk.mp4".into(), ".hidden".into());

        let plan = build_plan(&[analysis], &context);
        assert_eq!(
            names(&plan),
            vec!["_hidden-1.mp4", "_._.._evil-1.mp4", "a_b_c-1.mp4"]
        );
        for item in &plan {
            let joined = Path::new("/w/extracted").join(&item.output_name);
            assert_eq!(joined.parent(), Some(Path::new("/w/extracted")));
        }
    }

    #[test]
    fn test_fallback_names_never_collide() {
        // Lead-in and the first pair both want `_segment_001`.
        let analysis = VideoAnalysis::new(
            "talk.mp4",
            vec![seg(5.0, 9.0, &[]), seg(40.0, 44.0, &[]), seg(80.0, 86.0, &[])],
        );
        let plan = build_plan(&[analysis], &PlanContext::default());
        assert_eq!(
            names(&plan),
            vec![
                "talk_segment_001.mp4",
                "talk_segment_002.mp4",
                "talk_segment_003.mp4",
                "talk_segment_004.mp4",
            ]
        );
    }

    #[test]
    fn test_output_names_unique_and_order_preserved() {
        let analyses = vec![
            VideoAnalysis::new(
                "x.mkv",
                vec![
                    seg(1.0, 4.0, &["Ann"]),
                    seg(10.0, 14.0, &["Ann"]),
                    seg(20.0, 24.0, &["custom:Ann"]),
                ],
            ),
            VideoAnalysis::new("y.mkv", vec![seg(3.0, 7.0, &["Ann", "Ben"])]),
        ];
        let plan = build_plan(&analyses, &PlanContext::default());

        let unique: HashSet<&str> = names(&plan).into_iter().collect();
        assert_eq!(unique.len(), plan.len());

        let sources: Vec<&str> = plan.iter().map(|i| i.source_filename.as_str()).collect();
        assert_eq!(sources, vec!["x.mkv"; 4].into_iter().chain(["y.mkv"; 2]).collect::<Vec<_>>());
        assert!(plan[1].start_time < plan[2].start_time);
        assert_eq!(plan[3].output_name, "Ann-3.mkv");
        assert_eq!(plan[5].output_name, "Ann-4.mkv");
    }

    #[test]
    fn test_unselected_segments_and_videos_are_skipped() {
        let mut skipped = seg(30.0, 35.0, &["Zed"]);
        skipped.selected = false;
        let analyses = vec![
            VideoAnalysis::new("none.mp4", vec![skipped.clone()]),
            VideoAnalysis::new("empty.mp4", Vec::new()),
            VideoAnalysis::new("one.mp4", vec![skipped, seg(50.0, 55.0, &[])]),
        ];
        let plan = build_plan(&analyses, &PlanContext::default());
        assert_eq!(names(&plan), vec!["one_segment_001.mp4", "one_segment_002.mp4"]);
        assert_eq!(plan[0].end_time, 55.0);
    }

    #[test]
    fn test_empty_input_gives_empty_plan() {
        assert!(build_plan(&[], &PlanContext::default()).is_empty());
    }

    #[test]
    fn test_extension_defaults_to_mp4() {
        let analysis = VideoAnalysis::new("recording", vec![seg(5.0, 9.0, &["Kim"])]);
        let plan = build_plan(&[analysis], &PlanContext::default());
        assert_eq!(names(&plan), vec!["recording_segment_001.mp4", "Kim-1.mp4"]);
    }
}
