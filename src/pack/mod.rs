//! Evidence pack codec.
//!
//! A pack is the directory `<base_dir>/<run_id>/` holding everything recorded
//! for one browser run of an ad-enabled page:
//! - `run_metadata.json` (required; its presence is what makes a pack)
//! - `network.har`, `dom_{initial,t3,t6}.html`
//! - `screenshots/full.png`, `screenshots/crop_<id>.png`
//! - `iframes.json`, `tags.json`, `gpt_events.json` (enveloped arrays)
//!
//! [`write_evidence_pack`] produces that layout from a [`PackCapture`];
//! [`load_evidence_pack`] reads it back into a canonical [`LoadedPack`],
//! resolving the legacy field names listed in [`alias`].

pub mod alias;
pub mod error;
pub mod loader;
pub mod model;
pub mod normalize;
pub mod paths;
pub mod writer;

pub use error::{PackError, Result};
pub use loader::{list_runs, load_evidence_pack};
pub use model::{
    BoundingBox, DomSnapshots, GptEvent, GptEventType, IframeRecord, ImageData, LoadedPack,
    NetworkCapture, NetworkPayload, PackCapture, RunMetadata, ScreenshotIndex, ScreenshotSet,
    TagRecord, TagType, TriState, Viewport,
};
pub use normalize::{normalize_gpt_events, normalize_iframes, normalize_tags, parse_size};
pub use paths::{DomCheckpoint, EvidencePackPaths};
pub use writer::write_evidence_pack;
