//! Reconstructs a canonical [`LoadedPack`] from a pack directory.
//!
//! Only `run_metadata.json` is required. Every other artifact is read on its
//! own and dropped (with a log line) when missing or unreadable.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use super::error::{PackError, Result};
use super::model::{DomSnapshots, LoadedPack, NetworkCapture, RunMetadata, ScreenshotIndex};
use super::normalize::{normalize_gpt_events, normalize_iframes, normalize_tags};
use super::paths::{crop_id_from_file_name, DomCheckpoint, EvidencePackPaths};

/// Load the pack rooted at `pack_path`.
///
/// Returns `None` when there is no usable pack there: the metadata file is
/// missing, does not parse, or carries an empty run id.
pub fn load_evidence_pack(pack_path: &Path) -> Option<LoadedPack> {
    let paths = EvidencePackPaths::for_pack_dir(pack_path);
    let metadata = read_metadata(&paths.run_metadata)?;

    let dom = read_dom(&paths);
    let network = read_network(&paths.network);
    let screenshots = index_screenshots(&paths);
    let iframes = read_json(&paths.iframes).and_then(|doc| {
        normalize_iframes(&doc).or_else(|| unrecognized(&paths.iframes))
    });
    let tags = read_json(&paths.tags)
        .and_then(|doc| normalize_tags(&doc).or_else(|| unrecognized(&paths.tags)));
    let gpt_events = read_json(&paths.gpt_events).and_then(|doc| {
        normalize_gpt_events(&doc).or_else(|| unrecognized(&paths.gpt_events))
    });

    debug!(
        run_id = %metadata.run_id,
        path = %pack_path.display(),
        "Loaded evidence pack"
    );

    Some(LoadedPack {
        metadata,
        network,
        dom,
        screenshots,
        iframes,
        tags,
        gpt_events,
    })
}

/// Run ids of every loadable pack directly under `base_dir`, sorted.
///
/// A missing `base_dir` has no runs; any other failure to list it is an error.
pub fn list_runs(base_dir: &Path) -> Result<Vec<String>> {
    let entries = match fs::read_dir(base_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(PackError::io(base_dir, e)),
    };

    let mut runs: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            let paths = EvidencePackPaths::for_pack_dir(&entry.path());
            read_metadata(&paths.run_metadata)?;
            entry.file_name().into_string().ok()
        })
        .collect();
    runs.sort();
    Ok(runs)
}

fn read_metadata(path: &Path) -> Option<RunMetadata> {
    let bytes = read_optional(path)?;
    match serde_json::from_slice::<RunMetadata>(&bytes) {
        Ok(meta) if !meta.run_id.trim().is_empty() => Some(meta),
        Ok(_) => {
            warn!(path = %path.display(), "Run metadata has an empty run id");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to parse run metadata");
            None
        }
    }
}

fn read_optional(path: &Path) -> Option<Vec<u8>> {
    match fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Pack artifact not present");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read pack artifact");
            None
        }
    }
}

fn read_json(path: &Path) -> Option<Value> {
    let bytes = read_optional(path)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| {
            warn!(path = %path.display(), error = %e, "Failed to parse pack artifact");
        })
        .ok()
}

fn unrecognized<T>(path: &Path) -> Option<T> {
    warn!(path = %path.display(), "Pack artifact has no recognizable record array");
    None
}

/// Structured when the capture parses as JSON, raw text otherwise.
fn read_network(path: &Path) -> Option<NetworkCapture> {
    let bytes = read_optional(path)?;
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(NetworkCapture::Structured(value)),
        Err(e) => {
            debug!(
                path = %path.display(),
                error = %e,
                "Network capture is not JSON, keeping raw text"
            );
            Some(NetworkCapture::Raw(
                String::from_utf8_lossy(&bytes).into_owned(),
            ))
        }
    }
}

fn read_dom(paths: &EvidencePackPaths) -> DomSnapshots {
    let mut dom = DomSnapshots::default();
    for (checkpoint, path) in paths.dom_checkpoints() {
        if let Some(html) = read_text(path, checkpoint) {
            dom.set(checkpoint, html);
        }
    }
    dom
}

fn read_text(path: &Path, checkpoint: DomCheckpoint) -> Option<String> {
    let bytes = read_optional(path)?;
    match String::from_utf8(bytes) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!(
                path = %path.display(),
                checkpoint = checkpoint.as_str(),
                "DOM snapshot is not valid UTF-8, decoding lossily"
            );
            Some(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}

fn index_screenshots(paths: &EvidencePackPaths) -> ScreenshotIndex {
    let mut index = ScreenshotIndex::default();
    if paths.full_screenshot.is_file() {
        index.full = Some(paths.full_screenshot.clone());
    }

    let entries = match fs::read_dir(&paths.screenshots_dir) {
        Ok(entries) => entries,
        Err(_) => return index,
    };
    for entry in entries.filter_map(|e| e.ok()) {
        let path: PathBuf = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(crop_id) = entry.file_name().to_str().and_then(crop_id_from_file_name) {
            index.crops.insert(crop_id.to_string(), path);
        }
    }
    index
}
