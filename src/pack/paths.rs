//! Deterministic on-disk layout of an evidence pack.

use std::path::{Path, PathBuf};

use serde::Serialize;

pub const RUN_METADATA_JSON: &str = "run_metadata.json";
pub const NETWORK_HAR: &str = "network.har";
pub const DOM_INITIAL_HTML: &str = "dom_initial.html";
pub const DOM_T3_HTML: &str = "dom_t3.html";
pub const DOM_T6_HTML: &str = "dom_t6.html";
pub const SCREENSHOTS_DIRNAME: &str = "screenshots";
pub const FULL_SCREENSHOT_PNG: &str = "full.png";
pub const IFRAMES_JSON: &str = "iframes.json";
pub const TAGS_JSON: &str = "tags.json";
pub const GPT_EVENTS_JSON: &str = "gpt_events.json";

const CROP_PREFIX: &str = "crop_";
const PNG_SUFFIX: &str = ".png";

/// Every artifact path of one pack, computed from `(base_dir, run_id)` alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidencePackPaths {
    pub root: PathBuf,
    pub run_metadata: PathBuf,
    pub network: PathBuf,
    pub dom_initial: PathBuf,
    pub dom_t3: PathBuf,
    pub dom_t6: PathBuf,
    pub screenshots_dir: PathBuf,
    pub full_screenshot: PathBuf,
    pub iframes: PathBuf,
    pub tags: PathBuf,
    pub gpt_events: PathBuf,
}

impl EvidencePackPaths {
    /// Layout for the pack of `run_id` under `base_dir`.
    pub fn new(base_dir: &Path, run_id: &str) -> Self {
        Self::for_pack_dir(&base_dir.join(run_id))
    }

    /// Layout for a pack directory that already names the run.
    pub fn for_pack_dir(root: &Path) -> Self {
        let screenshots_dir = root.join(SCREENSHOTS_DIRNAME);
        Self {
            root: root.to_path_buf(),
            run_metadata: root.join(RUN_METADATA_JSON),
            network: root.join(NETWORK_HAR),
            dom_initial: root.join(DOM_INITIAL_HTML),
            dom_t3: root.join(DOM_T3_HTML),
            dom_t6: root.join(DOM_T6_HTML),
            full_screenshot: screenshots_dir.join(FULL_SCREENSHOT_PNG),
            screenshots_dir,
            iframes: root.join(IFRAMES_JSON),
            tags: root.join(TAGS_JSON),
            gpt_events: root.join(GPT_EVENTS_JSON),
        }
    }

    /// Path of the crop screenshot named `crop_<id>.png`.
    pub fn crop(&self, crop_id: &str) -> PathBuf {
        self.screenshots_dir.join(crop_file_name(crop_id))
    }

    /// DOM snapshot paths in checkpoint order.
    pub fn dom_checkpoints(&self) -> [(DomCheckpoint, &Path); 3] {
        [
            (DomCheckpoint::Initial, self.dom_initial.as_path()),
            (DomCheckpoint::T3, self.dom_t3.as_path()),
            (DomCheckpoint::T6, self.dom_t6.as_path()),
        ]
    }
}

/// Fixed points in run time at which the DOM is snapshotted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomCheckpoint {
    Initial,
    T3,
    T6,
}

impl DomCheckpoint {
    pub const ALL: [DomCheckpoint; 3] = [DomCheckpoint::Initial, DomCheckpoint::T3, DomCheckpoint::T6];

    pub fn as_str(&self) -> &'static str {
        match self {
            DomCheckpoint::Initial => "initial",
            DomCheckpoint::T3 => "t3",
            DomCheckpoint::T6 => "t6",
        }
    }
}

pub fn crop_file_name(crop_id: &str) -> String {
    format!("{CROP_PREFIX}{crop_id}{PNG_SUFFIX}")
}

/// Recover the crop id from a `crop_<id>.png` file name.
pub fn crop_id_from_file_name(file_name: &str) -> Option<&str> {
    file_name
        .strip_prefix(CROP_PREFIX)?
        .strip_suffix(PNG_SUFFIX)
        .filter(|id| !id.is_empty())
}

/// True when `value` can be joined onto a directory without escaping it.
pub fn is_single_component(value: &str) -> bool {
    !value.is_empty()
        && value != "."
        && value != ".."
        && !value.contains(['/', '\\'])
        && !value.contains('\0')
}
