//! Meeting session state: who presents what, plus the evening's toastmaster.

use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use crate::{
    error::Result,
    planner::PlanContext,
    types::{CUSTOM_LABEL_PREFIX, VideoAnalysis},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeetingState {
    /// Video filename -> presenter of its lead-in clip
    pub default_presenters: BTreeMap<String, String>,
    pub toastmaster: Option<String>,
    pub roster: Vec<String>,
}

/// Split a comma-separated list of names, trimming blanks.
pub fn parse_presenter_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(name: &str) -> Option<String> {
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

impl MeetingState {
    /// Load the session file, or an empty session when there is none yet.
    pub async fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no session file, starting fresh");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let pretty_json = serde_json::to_string_pretty(self)?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, &pretty_json).await?;
        if let Err(e) = fs::rename(&tmp_path, path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Set or clear (empty name) the default presenter of a video.
    pub fn set_default_presenter(&mut self, filename: &str, name: &str) {
        match non_empty(name) {
            Some(name) => {
                self.check_roster(&name);
                self.default_presenters.insert(filename.to_string(), name);
            }
            None => {
                self.default_presenters.remove(filename);
            }
        }
    }

    pub fn set_toastmaster(&mut self, name: &str) {
        self.toastmaster = non_empty(name);
        if let Some(name) = &self.toastmaster {
            self.check_roster(name);
        }
    }

    pub fn set_roster(&mut self, input: &str) {
        self.roster = parse_presenter_list(input);
    }

    /// Whether a tag names someone on the roster. Custom labels always pass,
    /// and so does everything while the roster is empty.
    pub fn is_known(&self, tag: &str) -> bool {
        let tag = tag.trim();
        self.roster.is_empty()
            || tag.starts_with(CUSTOM_LABEL_PREFIX)
            || self.roster.iter().any(|name| name == tag)
    }

    /// Warn about a name missing from the roster. Returns whether it is known.
    pub fn check_roster(&self, tag: &str) -> bool {
        let known = self.is_known(tag);
        if !known {
            warn!(tag, roster = ?self.roster, "name is not on the presenter roster");
        }
        known
    }

    /// Tag every segment of every video with the toastmaster.
    /// Returns how many tags were added.
    pub fn apply_toastmaster(&self, analyses: &mut [VideoAnalysis]) -> usize {
        let Some(name) = &self.toastmaster else {
            return 0;
        };
        analyses
            .iter_mut()
            .flat_map(|analysis| analysis.segments.iter_mut())
            .map(|segment| segment.add_tag(name))
            .filter(|&added| added)
            .count()
    }

    pub fn plan_context(&self) -> PlanContext {
        PlanContext {
            default_presenters: self.default_presenters.clone(),
            toastmaster: self.toastmaster.clone(),
        }
    }
}
