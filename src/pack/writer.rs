//! Serializes a capture into the pack directory layout.

use std::borrow::Cow;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose;
use base64::Engine as _;
use serde::Serialize;
use tempfile::NamedTempFile;

use super::error::{PackError, Result};
use super::model::{GptEvent, IframeRecord, ImageData, NetworkPayload, PackCapture, TagRecord};
use super::paths::{is_single_component, EvidencePackPaths};

/// Mode of every written artifact, as a plain `fs::write` gives under umask 022.
#[cfg(unix)]
const ARTIFACT_MODE: u32 = 0o644;

#[derive(Serialize)]
struct IframesEnvelope<'a> {
    iframes: &'a [IframeRecord],
}

#[derive(Serialize)]
struct TagsEnvelope<'a> {
    tags: &'a [TagRecord],
}

#[derive(Serialize)]
struct GptEventsEnvelope<'a> {
    events: &'a [GptEvent],
}

/// Write `capture` under `base_dir/<run id>/` and return the full path set.
///
/// Every artifact is encoded before anything touches disk, so bad input
/// (an unusable id, undecodable base64) fails without leaving files behind.
/// Re-writing the same run replaces the files it writes; artifacts absent from
/// `capture` are left alone.
pub fn write_evidence_pack(base_dir: &Path, capture: &PackCapture) -> Result<EvidencePackPaths> {
    let run_id = capture.run_id();
    if !is_single_component(run_id) {
        return Err(PackError::InvalidRunId(run_id.to_string()));
    }
    if let Some(iframes) = &capture.iframes {
        check_record_ids("iframe", iframes.iter().map(|f| f.id.as_str()))?;
    }
    if let Some(tags) = &capture.tags {
        check_record_ids("tag", tags.iter().map(|t| t.id.as_str()))?;
    }
    let paths = EvidencePackPaths::new(base_dir, run_id);

    let mut files: Vec<(PathBuf, Cow<'_, [u8]>)> = Vec::new();

    files.push((
        paths.run_metadata.clone(),
        Cow::Owned(serde_json::to_vec_pretty(&capture.metadata)?),
    ));

    if let Some(network) = &capture.network {
        let bytes = match network {
            NetworkPayload::Bytes(bytes) => Cow::Borrowed(bytes.as_slice()),
            NetworkPayload::Text(text) => Cow::Borrowed(text.as_bytes()),
            NetworkPayload::Json(value) => Cow::Owned(serde_json::to_vec_pretty(value)?),
        };
        files.push((paths.network.clone(), bytes));
    }

    for (checkpoint, path) in paths.dom_checkpoints() {
        if let Some(html) = capture.dom.get(checkpoint) {
            files.push((path.to_path_buf(), Cow::Borrowed(html.as_bytes())));
        }
    }

    if let Some(screenshots) = &capture.screenshots {
        if let Some(full) = &screenshots.full {
            files.push((paths.full_screenshot.clone(), decode_image("full", full)?));
        }
        for (crop_id, image) in &screenshots.crops {
            if !is_single_component(crop_id) {
                return Err(PackError::InvalidCropId(crop_id.clone()));
            }
            files.push((paths.crop(crop_id), decode_image(crop_id, image)?));
        }
    }

    if let Some(iframes) = &capture.iframes {
        let envelope = IframesEnvelope { iframes };
        files.push((paths.iframes.clone(), Cow::Owned(serde_json::to_vec_pretty(&envelope)?)));
    }
    if let Some(tags) = &capture.tags {
        let envelope = TagsEnvelope { tags };
        files.push((paths.tags.clone(), Cow::Owned(serde_json::to_vec_pretty(&envelope)?)));
    }
    if let Some(events) = &capture.gpt_events {
        let envelope = GptEventsEnvelope { events };
        files.push((
            paths.gpt_events.clone(),
            Cow::Owned(serde_json::to_vec_pretty(&envelope)?),
        ));
    }

    for (path, bytes) in &files {
        write_atomic(path, bytes)?;
    }

    tracing::info!(
        run_id = %run_id,
        path = %paths.root.display(),
        files = files.len(),
        "Wrote evidence pack"
    );

    Ok(paths)
}

/// Blank ids would load back as positional ids, so they are refused up front.
fn check_record_ids<'a>(kind: &'static str, ids: impl Iterator<Item = &'a str>) -> Result<()> {
    match ids.enumerate().find(|(_, id)| id.trim().is_empty()) {
        Some((index, _)) => Err(PackError::BlankRecordId { kind, index }),
        None => Ok(()),
    }
}

/// Write through a temp file in the target directory, then rename over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| PackError::io(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| PackError::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| PackError::io(path, e))?;
    tmp.flush().map_err(|e| PackError::io(path, e))?;
    // Temp files are created owner-only; packs are read by other stages.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(ARTIFACT_MODE))
            .map_err(|e| PackError::io(path, e))?;
    }
    tmp.persist(path).map_err(|e| PackError::io(path, e.error))?;

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "Wrote pack artifact");
    Ok(())
}

fn decode_image<'a>(name: &str, image: &'a ImageData) -> Result<Cow<'a, [u8]>> {
    let text = match image {
        ImageData::Binary(bytes) => return Ok(Cow::Borrowed(bytes.as_slice())),
        ImageData::Base64(text) => text,
    };

    let encoded = match text.strip_prefix("data:") {
        Some(rest) => {
            rest.split_once(";base64,")
                .ok_or_else(|| PackError::InvalidDataUrl(name.to_string()))?
                .1
        }
        None => text.as_str(),
    };
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map(Cow::Owned)
        .map_err(|source| PackError::Base64 {
            name: name.to_string(),
            source,
        })
}
