//! Integration tests for loading packs from older or damaged producers
//!
//! Packs here are written by hand, file by file, the way earlier capture
//! versions laid them out.

use super::common::fixtures::TestBaseDir;
use evidence_pack::pack::{
    load_evidence_pack, GptEventType, NetworkCapture, TagType, TriState,
};
use serde_json::json;

const META: &str = r#"{
  "runId": "legacy-1",
  "url": "https://old.example/",
  "startedAt": "2023-05-01T10:00:00Z",
  "userAgent": "LegacyBot/0.9",
  "viewport": { "width": 1280, "height": 720 }
}"#;

/// `boundingBox`/`tinyFlag` normalize identically to `bbox`/`isTiny`
#[test]
fn test_legacy_iframe_fields_match_modern() {
    let base = TestBaseDir::new();
    base.write_raw("modern", "run_metadata.json", META);
    base.write_raw(
        "modern",
        "iframes.json",
        json!({ "iframes": [{
            "id": "f1",
            "bbox": { "x": 5, "y": 6, "width": 300, "height": 250 },
            "isTiny": false,
            "areaPctOfViewport": 8.1
        }]})
        .to_string(),
    );
    base.write_raw("legacy", "run_metadata.json", META);
    base.write_raw(
        "legacy",
        "iframes.json",
        json!({ "iframes": [{
            "id": "f1",
            "boundingBox": { "x": 5, "y": 6, "width": 300, "height": 250 },
            "tinyFlag": false,
            "viewportCoveragePct": 8.1
        }]})
        .to_string(),
    );

    let modern = load_evidence_pack(&base.pack_dir("modern")).unwrap();
    let legacy = load_evidence_pack(&base.pack_dir("legacy")).unwrap();

    assert_eq!(modern.iframes, legacy.iframes);
    let frame = &legacy.iframes.unwrap()[0];
    assert_eq!(frame.bbox.width, 300.0);
    assert_eq!(frame.is_tiny, TriState::No);
    assert_eq!(frame.is_ad, TriState::Unknown);
}

/// An iframe with no `id`/`name` at index 2 becomes `frame-2`
#[test]
fn test_positional_identifier_synthesis() {
    let base = TestBaseDir::new();
    base.write_raw("r", "run_metadata.json", META);
    base.write_raw(
        "r",
        "iframes.json",
        r#"{ "iframes": [ { "id": "a" }, { "name": "named" }, { "src": "https://x.example" } ] }"#,
    );
    base.write_raw("r", "tags.json", r#"{ "tags": [ {}, { "tagId": 77 } ] }"#);

    let pack = load_evidence_pack(&base.pack_dir("r")).unwrap();
    let ids: Vec<_> = pack.iframes.unwrap().into_iter().map(|f| f.id).collect();
    assert_eq!(ids, vec!["a", "named", "frame-2"]);

    let tags = pack.tags.unwrap();
    assert_eq!(tags[0].id, "tag-0");
    assert_eq!(tags[0].tag_type, TagType::Custom);
    assert_eq!(tags[1].id, "77");
}

/// Size strings parse, anything else leaves the size absent
#[test]
fn test_gpt_event_size_parsing() {
    let base = TestBaseDir::new();
    base.write_raw("r", "run_metadata.json", META);
    base.write_raw(
        "r",
        "gpt_events.json",
        r#"{ "events": [
            { "timestamp": 10, "type": "slotRenderEnded", "size": "300x250" },
            { "timestamp": 11, "type": "slotRenderEnded", "size": "abc" },
            { "ts": 12, "eventType": "mysteryEvent", "adUnit": "/99/side", "size": [160, 600] }
        ] }"#,
    );

    let events = load_evidence_pack(&base.pack_dir("r"))
        .unwrap()
        .gpt_events
        .unwrap();

    assert_eq!(events[0].size, Some([300, 250]));
    assert_eq!(events[1].size, None);
    assert_eq!(events[2].size, Some([160, 600]));
    assert_eq!(events[2].timestamp, 12.0);
    assert_eq!(events[2].event_type, GptEventType::AdRequested);
    assert_eq!(events[2].ad_unit_path.as_deref(), Some("/99/side"));
}

/// A directory with only `iframes.json` is not a pack
#[test]
fn test_missing_metadata_is_absent() {
    let base = TestBaseDir::new();
    base.write_raw("r", "iframes.json", r#"{ "iframes": [ { "id": "a" } ] }"#);

    assert!(load_evidence_pack(&base.pack_dir("r")).is_none());
    assert!(load_evidence_pack(&base.pack_dir("never-created")).is_none());
}

/// A non-JSON `network.har` loads as raw text and the rest of the pack still loads
#[test]
fn test_plain_text_capture_degrades_to_raw() {
    let base = TestBaseDir::new();
    base.write_raw("r", "run_metadata.json", META);
    base.write_raw("r", "network.har", "this is not json");
    base.write_raw("r", "dom_t3.html", "<div id=ad></div>");
    base.write_raw("r", "tags.json", r#"{ "tags": [ { "type": "UA", "fired": false } ] }"#);

    let pack = load_evidence_pack(&base.pack_dir("r")).unwrap();

    assert_eq!(
        pack.network,
        Some(NetworkCapture::Raw("this is not json".to_string()))
    );
    assert_eq!(pack.dom.t3.as_deref(), Some("<div id=ad></div>"));
    let tags = pack.tags.unwrap();
    assert_eq!(tags[0].tag_type, TagType::UniversalAnalytics);
    assert_eq!(tags[0].fired, TriState::No);
}

/// One corrupt artifact never takes the others down with it
#[test]
fn test_partially_corrupt_pack_loads_what_it_can() {
    let base = TestBaseDir::new();
    base.write_raw("r", "run_metadata.json", META);
    base.write_raw("r", "iframes.json", "{ \"iframes\": [ {");
    base.write_raw("r", "tags.json", "42");
    base.write_raw(
        "r",
        "gpt_events.json",
        r#"{ "gptEvents": [ { "event": "impressionViewable", "slot": "div-1" } ] }"#,
    );

    let pack = load_evidence_pack(&base.pack_dir("r")).unwrap();

    assert_eq!(pack.metadata.run_id, "legacy-1");
    assert_eq!(pack.metadata.ended_at, None);
    assert!(pack.iframes.is_none());
    assert!(pack.tags.is_none());
    let events = pack.gpt_events.unwrap();
    assert_eq!(events[0].event_type, GptEventType::ImpressionViewable);
    assert_eq!(events[0].slot_id.as_deref(), Some("div-1"));
}

/// Loading never modifies the pack directory
#[test]
fn test_load_does_not_touch_pack() {
    let base = TestBaseDir::new();
    base.write_raw("r", "run_metadata.json", META);
    let legacy = base.write_raw("r", "iframes.json", r#"[ { "boundingBox": { "w": 1 } } ]"#);

    let before = std::fs::read(&legacy).unwrap();
    load_evidence_pack(&base.pack_dir("r")).unwrap();

    assert_eq!(std::fs::read(&legacy).unwrap(), before);
    let entries = std::fs::read_dir(base.pack_dir("r")).unwrap().count();
    assert_eq!(entries, 2);
}
