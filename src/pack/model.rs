//! In-memory records of an evidence pack.
//!
//! The write-side types (`PackCapture` and friends) describe what a capture
//! stage hands to the writer. The canonical records (`IframeRecord`,
//! `TagRecord`, `GptEvent`) are what the loader produces after alias
//! resolution and defaulting; their serialized form is also what the writer
//! puts on disk.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Duration};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::normalize::{as_dimension, as_flag};
use super::paths::DomCheckpoint;

/// Three-valued flag: absent observations stay `Unknown` rather than `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TriState {
    #[default]
    Unknown,
    Yes,
    No,
}

impl TriState {
    pub fn as_bool(self) -> Option<bool> {
        match self {
            TriState::Unknown => None,
            TriState::Yes => Some(true),
            TriState::No => Some(false),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, TriState::Unknown)
    }

    pub fn is_yes(&self) -> bool {
        matches!(self, TriState::Yes)
    }
}

impl From<bool> for TriState {
    fn from(value: bool) -> Self {
        if value {
            TriState::Yes
        } else {
            TriState::No
        }
    }
}

impl From<Option<bool>> for TriState {
    fn from(value: Option<bool>) -> Self {
        value.map(TriState::from).unwrap_or_default()
    }
}

impl Serialize for TriState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_bool().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TriState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<bool>::deserialize(deserializer).map(TriState::from)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Viewport {
    #[serde(deserialize_with = "lenient_dimension")]
    pub width: u32,
    #[serde(deserialize_with = "lenient_dimension")]
    pub height: u32,
}

/// Optional metadata fields: a value of the wrong shape (including `null`)
/// reads as the default instead of rejecting the whole record.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// Whole-number axes; `1366.0` reads as `1366`.
fn lenient_dimension<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(as_dimension(&value).unwrap_or_default())
}

/// Entries whose value is not a recognizable flag are dropped.
fn lenient_flags<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<BTreeMap<String, bool>>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_object().map(|flags| {
        flags
            .iter()
            .filter_map(|(name, v)| as_flag(v).map(|on| (name.clone(), on)))
            .collect()
    }))
}

/// Identity and context of one recorded run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    /// Names the pack directory. The only field that can reject a record.
    pub run_id: String,
    #[serde(default, deserialize_with = "lenient")]
    pub url: String,
    #[serde(default, deserialize_with = "lenient")]
    pub started_at: String,
    /// Missing when the run was cut short before it finished.
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub ended_at: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub user_agent: String,
    #[serde(default, deserialize_with = "lenient")]
    pub viewport: Viewport,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub locale: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub template: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_flags",
        skip_serializing_if = "Option::is_none"
    )]
    pub feature_flags: Option<BTreeMap<String, bool>>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub expected_tags: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<String>,
}

impl RunMetadata {
    pub fn new(run_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            url: url.into(),
            started_at: String::new(),
            ended_at: None,
            user_agent: String::new(),
            viewport: Viewport::default(),
            locale: None,
            template: None,
            feature_flags: None,
            expected_tags: None,
            notes: None,
        }
    }

    /// Elapsed run time, when both timestamps are valid RFC 3339.
    pub fn duration(&self) -> Option<Duration> {
        let started = DateTime::parse_from_rfc3339(&self.started_at).ok()?;
        let ended = DateTime::parse_from_rfc3339(self.ended_at.as_deref()?).ok()?;
        Some(ended.signed_duration_since(started))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Observed geometry and classification of one nested browsing context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IframeRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default)]
    pub bbox: BoundingBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default)]
    pub area_pct_of_viewport: f64,
    /// Overlap percentage keyed by the other frame's id.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overlap_pct: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "TriState::is_unknown")]
    pub is_tiny: TriState,
    #[serde(default, skip_serializing_if = "TriState::is_unknown")]
    pub is_hidden: TriState,
    #[serde(default, skip_serializing_if = "TriState::is_unknown")]
    pub is_ad: TriState,
}

impl IframeRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            src: None,
            bbox: BoundingBox::default(),
            z_index: None,
            visibility: None,
            opacity: None,
            area_pct_of_viewport: 0.0,
            overlap_pct: BTreeMap::new(),
            is_tiny: TriState::Unknown,
            is_hidden: TriState::Unknown,
            is_ad: TriState::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TagType {
    Ga4,
    UniversalAnalytics,
    GoogleAds,
    Floodlight,
    CustomHtml,
    #[default]
    Custom,
}

impl TagType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagType::Ga4 => "GA4",
            TagType::UniversalAnalytics => "UA",
            TagType::GoogleAds => "GoogleAds",
            TagType::Floodlight => "Floodlight",
            TagType::CustomHtml => "CustomHTML",
            TagType::Custom => "Custom",
        }
    }

    /// Map a producer's type string onto the closed set; unknown names become `Custom`.
    pub fn from_loose(raw: &str) -> Self {
        let key: String = raw
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "ga4" | "gaawe" | "gaawc" | "googtag" => TagType::Ga4,
            "ua" | "universalanalytics" => TagType::UniversalAnalytics,
            "googleads" | "awct" | "sp" => TagType::GoogleAds,
            "floodlight" | "flc" | "fls" => TagType::Floodlight,
            "customhtml" | "html" => TagType::CustomHtml,
            _ => TagType::Custom,
        }
    }
}

impl Serialize for TagType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TagType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(TagType::from_loose).unwrap_or_default())
    }
}

/// One tag-management entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagRecord {
    pub id: String,
    #[serde(rename = "type", default)]
    pub tag_type: TagType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "TriState::is_unknown")]
    pub fired: TriState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_urls: Option<Vec<String>>,
}

impl TagRecord {
    pub fn new(id: impl Into<String>, tag_type: TagType) -> Self {
        Self {
            id: id.into(),
            tag_type,
            name: None,
            container_id: None,
            triggers: None,
            fired: TriState::Unknown,
            origin_urls: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GptEventType {
    #[default]
    AdRequested,
    SlotRequested,
    SlotResponseReceived,
    SlotRenderEnded,
    SlotOnload,
    ImpressionViewable,
    SlotVisibilityChanged,
}

impl GptEventType {
    const ALL: [GptEventType; 7] = [
        GptEventType::AdRequested,
        GptEventType::SlotRequested,
        GptEventType::SlotResponseReceived,
        GptEventType::SlotRenderEnded,
        GptEventType::SlotOnload,
        GptEventType::ImpressionViewable,
        GptEventType::SlotVisibilityChanged,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GptEventType::AdRequested => "adRequested",
            GptEventType::SlotRequested => "slotRequested",
            GptEventType::SlotResponseReceived => "slotResponseReceived",
            GptEventType::SlotRenderEnded => "slotRenderEnded",
            GptEventType::SlotOnload => "slotOnload",
            GptEventType::ImpressionViewable => "impressionViewable",
            GptEventType::SlotVisibilityChanged => "slotVisibilityChanged",
        }
    }

    /// Case-insensitive match on the event name; unknown names become `AdRequested`.
    pub fn from_loose(raw: &str) -> Self {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(raw))
            .unwrap_or_default()
    }
}

impl Serialize for GptEventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for GptEventType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(GptEventType::from_loose).unwrap_or_default())
    }
}

/// One timestamped programmatic ad-serving event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GptEvent {
    /// Milliseconds since navigation start.
    #[serde(default)]
    pub timestamp: f64,
    #[serde(rename = "type", default)]
    pub event_type: GptEventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_unit_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// `[width, height]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<[u32; 2]>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub payload: Map<String, Value>,
}

impl GptEvent {
    pub fn new(timestamp: f64, event_type: GptEventType) -> Self {
        Self {
            timestamp,
            event_type,
            slot_id: None,
            ad_unit_path: None,
            request_id: None,
            size: None,
            payload: Map::new(),
        }
    }
}

/// DOM text captured at the three fixed checkpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomSnapshots {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t3: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t6: Option<String>,
}

impl DomSnapshots {
    pub fn get(&self, checkpoint: DomCheckpoint) -> Option<&str> {
        match checkpoint {
            DomCheckpoint::Initial => self.initial.as_deref(),
            DomCheckpoint::T3 => self.t3.as_deref(),
            DomCheckpoint::T6 => self.t6.as_deref(),
        }
    }

    pub fn set(&mut self, checkpoint: DomCheckpoint, html: String) {
        let slot = match checkpoint {
            DomCheckpoint::Initial => &mut self.initial,
            DomCheckpoint::T3 => &mut self.t3,
            DomCheckpoint::T6 => &mut self.t6,
        };
        *slot = Some(html);
    }

    pub fn is_empty(&self) -> bool {
        self.initial.is_none() && self.t3.is_none() && self.t6.is_none()
    }
}

/// Network capture as handed to the writer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NetworkPayload {
    /// Already-encoded capture bytes, written verbatim.
    #[serde(skip_deserializing)]
    Bytes(Vec<u8>),
    /// Already-serialized capture text, written verbatim.
    Text(String),
    /// Structured capture, written as pretty-printed JSON.
    Json(Value),
}

/// Screenshot image as handed to the writer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ImageData {
    /// Base64 text, optionally a `data:<mime>;base64,` URL.
    Base64(String),
    Binary(Vec<u8>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ScreenshotSet {
    #[serde(default)]
    pub full: Option<ImageData>,
    /// Crops keyed by identifier.
    #[serde(default)]
    pub crops: BTreeMap<String, ImageData>,
}

/// Everything a capture stage hands to the writer for one run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackCapture {
    pub metadata: RunMetadata,
    #[serde(default)]
    pub network: Option<NetworkPayload>,
    #[serde(default)]
    pub dom: DomSnapshots,
    #[serde(default)]
    pub screenshots: Option<ScreenshotSet>,
    #[serde(default)]
    pub iframes: Option<Vec<IframeRecord>>,
    #[serde(default)]
    pub tags: Option<Vec<TagRecord>>,
    #[serde(default)]
    pub gpt_events: Option<Vec<GptEvent>>,
}

impl PackCapture {
    pub fn new(metadata: RunMetadata) -> Self {
        Self {
            metadata,
            network: None,
            dom: DomSnapshots::default(),
            screenshots: None,
            iframes: None,
            tags: None,
            gpt_events: None,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.metadata.run_id
    }
}

/// Network capture as read back from disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NetworkCapture {
    Structured(Value),
    /// Content that did not parse as JSON, passed through as text.
    Raw(String),
}

impl NetworkCapture {
    pub fn as_structured(&self) -> Option<&Value> {
        match self {
            NetworkCapture::Structured(value) => Some(value),
            NetworkCapture::Raw(_) => None,
        }
    }

    pub fn as_raw(&self) -> Option<&str> {
        match self {
            NetworkCapture::Structured(_) => None,
            NetworkCapture::Raw(text) => Some(text),
        }
    }
}

/// Screenshot files found in a pack. Bytes are not read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScreenshotIndex {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full: Option<PathBuf>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub crops: BTreeMap<String, PathBuf>,
}

impl ScreenshotIndex {
    pub fn is_empty(&self) -> bool {
        self.full.is_none() && self.crops.is_empty()
    }
}

/// Canonical reconstruction of a pack directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedPack {
    pub metadata: RunMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkCapture>,
    #[serde(skip_serializing_if = "DomSnapshots::is_empty")]
    pub dom: DomSnapshots,
    #[serde(skip_serializing_if = "ScreenshotIndex::is_empty")]
    pub screenshots: ScreenshotIndex,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iframes: Option<Vec<IframeRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpt_events: Option<Vec<GptEvent>>,
}
