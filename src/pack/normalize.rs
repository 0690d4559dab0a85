//! Raw JSON → canonical record normalization.
//!
//! Every function here is pure. Field names are resolved through the tables in
//! [`super::alias`]; values are coerced leniently, and anything that cannot be
//! coerced is treated as absent rather than failing the record.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::alias::{
    AliasTable, BBOX_FIELDS, ENVELOPE_FIELDS, GPT_EVENT_FIELDS, IFRAME_FIELDS, TAG_FIELDS,
};
use super::model::{
    BoundingBox, GptEvent, GptEventType, IframeRecord, TagRecord, TagType, TriState,
};

pub const IFRAME_ID_PREFIX: &str = "frame";
pub const TAG_ID_PREFIX: &str = "tag";

/// Normalize the contents of an `iframes.json` file.
///
/// Accepts the `{ "iframes": [...] }` envelope or a bare array. Returns `None`
/// when the document has neither shape.
pub fn normalize_iframes(doc: &Value) -> Option<Vec<IframeRecord>> {
    envelope_items(doc, "iframes").map(|items| normalize_items(items, normalize_iframe))
}

/// Normalize the contents of a `tags.json` file.
pub fn normalize_tags(doc: &Value) -> Option<Vec<TagRecord>> {
    envelope_items(doc, "tags").map(|items| normalize_items(items, normalize_tag))
}

/// Normalize the contents of a `gpt_events.json` file.
pub fn normalize_gpt_events(doc: &Value) -> Option<Vec<GptEvent>> {
    envelope_items(doc, "events").map(|items| normalize_items(items, normalize_gpt_event))
}

fn envelope_items<'a>(doc: &'a Value, key: &'static str) -> Option<&'a Vec<Value>> {
    match doc {
        Value::Array(items) => Some(items),
        Value::Object(map) => ENVELOPE_FIELDS.resolve_with(map, key, Value::as_array),
        _ => None,
    }
}

/// Non-object entries are skipped; `index` stays the position in the source array.
fn normalize_items<T>(items: &[Value], normalize: fn(&Map<String, Value>, usize) -> T) -> Vec<T> {
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| item.as_object().map(|raw| normalize(raw, index)))
        .collect()
}

/// Normalize one raw iframe observation found at `index` in its array.
///
/// A record without `id`/`name` gets `frame-<index>`, which is only stable
/// while the producer keeps its ordering.
pub fn normalize_iframe(raw: &Map<String, Value>, index: usize) -> IframeRecord {
    let t = &IFRAME_FIELDS;
    IframeRecord {
        id: t
            .resolve_with(raw, "id", as_identifier)
            .unwrap_or_else(|| synthesized_id(IFRAME_ID_PREFIX, index)),
        src: t.resolve_with(raw, "src", as_text),
        bbox: t
            .resolve_with(raw, "bbox", Value::as_object)
            .map(normalize_bbox)
            .unwrap_or_default(),
        z_index: t.resolve_with(raw, "zIndex", as_integer),
        visibility: t.resolve_with(raw, "visibility", as_text),
        opacity: t.resolve_with(raw, "opacity", as_number),
        area_pct_of_viewport: t
            .resolve_with(raw, "areaPctOfViewport", as_number)
            .unwrap_or(0.0),
        overlap_pct: t
            .resolve_with(raw, "overlapPct", as_number_map)
            .unwrap_or_default(),
        is_tiny: flag(t, raw, "isTiny"),
        is_hidden: flag(t, raw, "isHidden"),
        is_ad: flag(t, raw, "isAd"),
    }
}

fn normalize_bbox(raw: &Map<String, Value>) -> BoundingBox {
    let axis = |name: &'static str| BBOX_FIELDS.resolve_with(raw, name, as_number).unwrap_or(0.0);
    BoundingBox {
        x: axis("x"),
        y: axis("y"),
        width: axis("width"),
        height: axis("height"),
    }
}

/// Normalize one raw tag record found at `index` in its array.
pub fn normalize_tag(raw: &Map<String, Value>, index: usize) -> TagRecord {
    let t = &TAG_FIELDS;
    TagRecord {
        id: t
            .resolve_with(raw, "id", as_identifier)
            .unwrap_or_else(|| synthesized_id(TAG_ID_PREFIX, index)),
        tag_type: t
            .resolve_with(raw, "type", Value::as_str)
            .map(TagType::from_loose)
            .unwrap_or_default(),
        name: t.resolve_with(raw, "name", as_text),
        container_id: t.resolve_with(raw, "containerId", as_label),
        triggers: t.resolve_with(raw, "triggers", as_string_list),
        fired: flag(t, raw, "fired"),
        origin_urls: t.resolve_with(raw, "originUrls", as_string_list),
    }
}

/// Normalize one raw GPT event. Events carry no synthesized identifier.
pub fn normalize_gpt_event(raw: &Map<String, Value>, _index: usize) -> GptEvent {
    let t = &GPT_EVENT_FIELDS;
    GptEvent {
        timestamp: t.resolve_with(raw, "timestamp", as_number).unwrap_or(0.0),
        event_type: t
            .resolve_with(raw, "type", Value::as_str)
            .map(GptEventType::from_loose)
            .unwrap_or_default(),
        slot_id: t.resolve_with(raw, "slotId", as_label),
        ad_unit_path: t.resolve_with(raw, "adUnitPath", as_text),
        request_id: t.resolve_with(raw, "requestId", as_label),
        size: t.resolve_with(raw, "size", parse_size),
        payload: t
            .resolve_with(raw, "payload", Value::as_object)
            .cloned()
            .unwrap_or_default(),
    }
}

fn synthesized_id(prefix: &str, index: usize) -> String {
    format!("{prefix}-{index}")
}

fn flag(table: &AliasTable, raw: &Map<String, Value>, canonical: &'static str) -> TriState {
    table.resolve_with(raw, canonical, as_flag).into()
}

/// Parse an ad size from `[width, height]` or `"<width>x<height>"`.
pub fn parse_size(value: &Value) -> Option<[u32; 2]> {
    static SIZE_RE: OnceLock<Option<Regex>> = OnceLock::new();
    match value {
        Value::Array(pair) if pair.len() == 2 => {
            Some([as_dimension(&pair[0])?, as_dimension(&pair[1])?])
        }
        Value::String(text) => {
            let re = SIZE_RE
                .get_or_init(|| Regex::new(r"^\s*(\d+)\s*[xX]\s*(\d+)\s*$").ok())
                .as_ref()?;
            let caps = re.captures(text)?;
            Some([caps[1].parse().ok()?, caps[2].parse().ok()?])
        }
        _ => None,
    }
}

pub(crate) fn as_dimension(value: &Value) -> Option<u32> {
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).ok();
    }
    let n = value.as_f64()?;
    (n.is_finite() && n >= 0.0 && n.fract() == 0.0 && n <= f64::from(u32::MAX)).then_some(n as u32)
}

fn as_text(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

/// Non-blank string, or an integer rendered as a string.
///
/// Record ids use this so a blank id falls through to `name` or a positional id.
fn as_identifier(value: &Value) -> Option<String> {
    as_label(value).filter(|s| !s.trim().is_empty())
}

/// Any string, or an integer rendered as a string.
fn as_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let n = as_number(value)?;
    (n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64).then_some(n as i64)
}

pub(crate) fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn as_number_map(value: &Value) -> Option<BTreeMap<String, f64>> {
    let map = value.as_object()?;
    Some(
        map.iter()
            .filter_map(|(key, v)| as_number(v).map(|n| (key.clone(), n)))
            .collect(),
    )
}

/// Array of strings/integers, or a single string.
fn as_string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(items.iter().filter_map(as_label).collect()),
        Value::String(s) => Some(vec![s.clone()]),
        _ => None,
    }
}
