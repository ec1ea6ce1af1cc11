use std::path::Path;

use uuid::Uuid;

use crate::{format::format_plan_preview, types::ExtractionPlanItem};

/// Quote `value` for a POSIX shell, single quotes only.
pub fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+@%,".contains(c))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// The ffmpeg arguments that cut one clip, shared by the script and the trimmer.
pub fn trim_args(source: &Path, start: f64, duration: f64, output: &Path) -> Vec<String> {
    vec![
        "-i".to_string(),
        source.to_string_lossy().into_owned(),
        "-ss".to_string(),
        format!("{start:.2}"),
        "-t".to_string(),
        format!("{duration:.2}"),
        "-c".to_string(),
        "copy".to_string(),
        "-avoid_negative_ts".to_string(),
        "make_zero".to_string(),
        "-y".to_string(),
        output.to_string_lossy().into_owned(),
    ]
}

/// Render a bash script that replays the plan with plain ffmpeg calls.
pub fn render_trim_script(
    plan: &[ExtractionPlanItem],
    source_dir: &Path,
    output_dir: &Path,
    ffmpeg_bin: &str,
    batch_id: Uuid,
) -> String {
    let mut script = String::new();
    script.push_str("#!/usr/bin/env bash\n");
    script.push_str("set -u\n\n");
    script.push_str(&format!("# batch {batch_id}\n"));
    for line in format_plan_preview(plan).lines().filter(|l| !l.is_empty()) {
        script.push_str(&format!("# {line}\n"));
    }
    script.push('\n');

    for item in plan {
        let args = trim_args(
            &source_dir.join(&item.source_filename),
            item.start_time,
            item.duration,
            &output_dir.join(&item.output_name),
        );
        let quoted: Vec<String> = args.iter().map(|a| shell_quote(a)).collect();
        script.push_str(&format!("{} {}\n", shell_quote(ffmpeg_bin), quoted.join(" ")));
    }

    script
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("talk.mp4"), "talk.mp4");
        assert_eq!(shell_quote("My Talk.mp4"), "'My Talk.mp4'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("$(rm -rf)"), "'$(rm -rf)'");
    }

    #[test]
    fn test_trim_args_use_two_decimals() {
        let args = trim_args(Path::new("a.mov"), 3.0, 245.5, Path::new("out/Bob-1.mov"));
        assert_eq!(
            args,
            vec![
                "-i", "a.mov", "-ss", "3.00", "-t", "245.50", "-c", "copy",
                "-avoid_negative_ts", "make_zero", "-y", "out/Bob-1.mov"
            ]
        );
    }

    #[test]
    fn test_script_has_one_line_per_item() {
        let plan = vec![
            ExtractionPlanItem {
                source_filename: "Club Night.mov".into(),
                start_time: 0.0,
                end_time: 66.0,
                duration: 66.0,
                output_name: "Bob-1.mov".into(),
            },
            ExtractionPlanItem {
                source_filename: "Club Night.mov".into(),
                start_time: 60.0,
                end_time: 305.0,
                duration: 245.0,
                output_name: "Alice-1.mov".into(),
            },
        ];
        let batch = Uuid::nil();
        let script = render_trim_script(
            &plan,
            Path::new("."),
            &PathBuf::from("./extracted"),
            "ffmpeg",
            batch,
        );

        assert!(script.starts_with("#!/usr/bin/env bash\nset -u\n"));
        assert!(script.contains(&format!("# batch {batch}")));
        let commands: Vec<&str> = script.lines().filter(|l| l.starts_with("ffmpeg ")).collect();
        assert_eq!(commands.len(), 2);
        assert_eq!(
            commands[1],
            "ffmpeg -i './Club Night.mov' -ss 60.00 -t 245.00 -c copy -avoid_negative_ts make_zero -y ./extracted/Alice-1.mov"
        );
    }
}
