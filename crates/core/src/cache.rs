use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Suffix of the per-video analysis record.
pub const ANALYSIS_SUFFIX: &str = "_applause_analysis.json";

pub const SESSION_FILE: &str = "applause_session.json";

const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "avi", "mov", "mkv", "wmv"];

pub fn get_root_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("applause")
}

/// Scratch WAV for one analysis run. Unique per call so parallel runs never share a file.
pub fn get_temp_audio_path(video_path: &Path) -> PathBuf {
    let stem = video_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    get_root_cache_dir().join(format!("{stem}_{}_temp_audio.wav", Uuid::new_v4().simple()))
}

/// `<dir>/<stem>_applause_analysis.json`, next to the video.
pub fn get_analysis_path(video_path: &Path) -> PathBuf {
    let stem = video_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    video_path.with_file_name(format!("{stem}{ANALYSIS_SUFFIX}"))
}

pub fn get_session_path(work_dir: &Path) -> PathBuf {
    work_dir.join(SESSION_FILE)
}

fn is_hidden_fork(name: &str) -> bool {
    name.starts_with("._")
}

pub fn is_video_file(path: &Path) -> bool {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
        return false;
    };
    if is_hidden_fork(&name) {
        return false;
    }
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
}

fn sorted_files(dir: &Path, keep: impl Fn(&Path) -> bool) -> std::io::Result<Vec<PathBuf>> {
    let mut found: Vec<PathBuf> = std::fs::read_dir(dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && keep(path))
        .collect();
    found.sort();
    Ok(found)
}

/// Video files directly inside `dir`, sorted by name.
pub fn find_videos(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    sorted_files(dir, is_video_file)
}

/// Analysis records directly inside `dir`, sorted by name.
pub fn find_analyses(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    sorted_files(dir, |path| {
        path.file_name()
            .map(|n| n.to_string_lossy())
            .is_some_and(|n| n.ends_with(ANALYSIS_SUFFIX) && !is_hidden_fork(&n))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_path_sits_next_to_video() {
        assert_eq!(
            get_analysis_path(Path::new("/meet/IMG_2333.MOV")),
            PathBuf::from("/meet/IMG_2333_applause_analysis.json")
        );
        assert_eq!(
            get_analysis_path(Path::new("talk.mp4")),
            PathBuf::from("talk_applause_analysis.json")
        );
    }

    #[test]
    fn test_temp_audio_paths_are_distinct() {
        let a = get_temp_audio_path(Path::new("talk.mp4"));
        let b = get_temp_audio_path(Path::new("talk.mp4"));
        assert_ne!(a, b);
        assert!(a.starts_with(get_root_cache_dir()));
        assert!(a.to_string_lossy().ends_with("_temp_audio.wav"));
    }

    #[test]
    fn test_video_detection() {
        assert!(is_video_file(Path::new("a.mp4")));
        assert!(is_video_file(Path::new("B.MOV")));
        assert!(is_video_file(Path::new("c.Mkv")));
        assert!(is_video_file(Path::new("d.wmv")));
        assert!(is_video_file(Path::new("e.avi")));
        assert!(!is_video_file(Path::new("._a.mp4")));
        assert!(!is_video_file(Path::new("notes.txt")));
        assert!(!is_video_file(Path::new("mp4")));
    }

    #[test]
    fn test_find_videos_and_analyses() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "b.MOV",
            "a.mp4",
            "._a.mp4",
            "notes.txt",
            "a_applause_analysis.json",
            "._a_applause_analysis.json",
            "applause_session.json",
        ] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("extracted.mp4")).unwrap();

        let videos = find_videos(dir.path()).unwrap();
        let names: Vec<_> = videos
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.mp4", "b.MOV"]);

        let analyses = find_analyses(dir.path()).unwrap();
        assert_eq!(analyses, vec![dir.path().join("a_applause_analysis.json")]);
    }
}
