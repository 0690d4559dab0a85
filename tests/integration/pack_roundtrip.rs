//! Integration tests for the write → load round trip
//!
//! Tests the flow: PackCapture -> write_evidence_pack -> directory ->
//! load_evidence_pack -> LoadedPack

use super::common::fixtures::{
    full_capture, full_metadata, read_json, sample_gpt_events, sample_iframes, sample_tags,
    TestBaseDir,
};
use evidence_pack::pack::{
    list_runs, load_evidence_pack, write_evidence_pack, GptEvent, GptEventType, IframeRecord,
    NetworkCapture, NetworkPayload, PackCapture,
};
use serde_json::json;

/// A fully populated capture loads back with identical metadata and records
#[test]
fn test_full_capture_roundtrip() {
    let base = TestBaseDir::new();
    let capture = full_capture("run-full");

    let paths = write_evidence_pack(&base.path, &capture).expect("write should succeed");
    let loaded = load_evidence_pack(&paths.root).expect("pack should load");

    assert_eq!(loaded.metadata, full_metadata("run-full"));
    assert_eq!(loaded.iframes, Some(sample_iframes()));
    assert_eq!(loaded.tags, Some(sample_tags()));
    assert_eq!(loaded.gpt_events, Some(sample_gpt_events()));
    assert_eq!(loaded.dom, capture.dom);

    let network = loaded.network.expect("network should load");
    assert_eq!(
        network.as_structured().unwrap()["log"]["entries"][0]["request"]["url"],
        json!("https://securepubads.example/gampad/ads")
    );

    assert_eq!(loaded.screenshots.full, Some(paths.full_screenshot.clone()));
    assert_eq!(
        loaded.screenshots.crops.get("google_ads_iframe_top"),
        Some(&paths.crop("google_ads_iframe_top"))
    );
    assert_eq!(std::fs::read(&paths.full_screenshot).unwrap(), b"PNGDATA");
}

/// Writing an already-loaded pack again reproduces the same files
#[test]
fn test_rewrite_of_loaded_pack_is_stable() {
    let base = TestBaseDir::new();
    let paths = write_evidence_pack(&base.path, &full_capture("run-a")).unwrap();
    let first = load_evidence_pack(&paths.root).unwrap();

    let mut again = PackCapture::new(first.metadata.clone());
    again.iframes = first.iframes.clone();
    again.tags = first.tags.clone();
    again.gpt_events = first.gpt_events.clone();
    let other = TestBaseDir::new();
    let paths_again = write_evidence_pack(&other.path, &again).unwrap();

    assert_eq!(read_json(&paths.iframes), read_json(&paths_again.iframes));
    assert_eq!(read_json(&paths.tags), read_json(&paths_again.tags));
    assert_eq!(read_json(&paths.gpt_events), read_json(&paths_again.gpt_events));
    assert_eq!(
        read_json(&paths.run_metadata),
        read_json(&paths_again.run_metadata)
    );
}

/// Omitted arrays load as absent, not empty
#[test]
fn test_omitted_tags_load_as_absent() {
    let base = TestBaseDir::new();
    let mut capture = full_capture("run-no-tags");
    capture.tags = None;

    let paths = write_evidence_pack(&base.path, &capture).unwrap();
    assert!(!paths.tags.exists());

    let loaded = load_evidence_pack(&paths.root).unwrap();
    assert!(loaded.tags.is_none());
    assert!(loaded.iframes.is_some());

    let as_json = serde_json::to_value(&loaded).unwrap();
    assert!(as_json.get("tags").is_none());
}

/// An explicitly empty array stays an empty array
#[test]
fn test_empty_tags_load_as_empty() {
    let base = TestBaseDir::new();
    let mut capture = full_capture("run-empty-tags");
    capture.tags = Some(vec![]);

    let paths = write_evidence_pack(&base.path, &capture).unwrap();
    let loaded = load_evidence_pack(&paths.root).unwrap();

    assert_eq!(loaded.tags, Some(vec![]));
}

/// The returned path set does not depend on which artifacts were written
#[test]
fn test_paths_returned_even_for_unwritten_artifacts() {
    let base = TestBaseDir::new();
    let minimal = PackCapture::new(full_metadata("run-min"));
    let full = full_capture("run-min");

    let minimal_paths = write_evidence_pack(&base.path, &minimal).unwrap();
    let full_paths = write_evidence_pack(&base.path, &full).unwrap();

    assert_eq!(minimal_paths, full_paths);
}

/// Raw network text survives the round trip byte for byte
#[test]
fn test_raw_network_text_roundtrip() {
    let base = TestBaseDir::new();
    let mut capture = full_capture("run-raw-net");
    capture.network = Some(NetworkPayload::Text("# proxy dump\nGET /ad".to_string()));

    let paths = write_evidence_pack(&base.path, &capture).unwrap();
    let loaded = load_evidence_pack(&paths.root).unwrap();

    assert_eq!(
        loaded.network,
        Some(NetworkCapture::Raw("# proxy dump\nGET /ad".to_string()))
    );
    assert_eq!(loaded.iframes, Some(sample_iframes()));
}

/// Pre-serialized JSON text is written verbatim and loads structured
#[test]
fn test_preserialized_network_json_loads_structured() {
    let base = TestBaseDir::new();
    let mut capture = full_capture("run-har-text");
    capture.network = Some(NetworkPayload::Bytes(br#"{"log":{"entries":[]}}"#.to_vec()));

    let paths = write_evidence_pack(&base.path, &capture).unwrap();
    assert_eq!(
        std::fs::read_to_string(&paths.network).unwrap(),
        r#"{"log":{"entries":[]}}"#
    );

    let loaded = load_evidence_pack(&paths.root).unwrap();
    assert_eq!(
        loaded.network,
        Some(NetworkCapture::Structured(json!({ "log": { "entries": [] } })))
    );
}

/// Every written pack is discoverable under its base directory
#[test]
fn test_written_packs_are_listed() {
    let base = TestBaseDir::new();
    write_evidence_pack(&base.path, &full_capture("run-2")).unwrap();
    write_evidence_pack(&base.path, &PackCapture::new(full_metadata("run-1"))).unwrap();
    base.write_raw("not-a-pack", "iframes.json", r#"{"iframes": []}"#);

    assert_eq!(list_runs(&base.path).unwrap(), vec!["run-1", "run-2"]);
}

/// Computed coverage values and timestamps come back bit-for-bit
#[test]
fn test_fractional_floats_roundtrip_exactly() {
    let base = TestBaseDir::new();
    let mut capture = PackCapture::new(full_metadata("run-floats"));
    let mut frame = IframeRecord::new("slot-a");
    frame.area_pct_of_viewport = 10.873020599276213;
    frame.bbox.y = 1834.6000366210938;
    frame.opacity = Some(0.30000000000000004);
    frame.overlap_pct.insert("slot-b".to_string(), 33.33333333333333);
    capture.iframes = Some(vec![frame.clone()]);
    capture.gpt_events = Some(vec![GptEvent::new(
        1712.8999999761581,
        GptEventType::SlotRenderEnded,
    )]);

    let paths = write_evidence_pack(&base.path, &capture).unwrap();
    let loaded = load_evidence_pack(&paths.root).unwrap();

    assert_eq!(loaded.iframes, Some(vec![frame]));
    assert_eq!(loaded.gpt_events.unwrap()[0].timestamp, 1712.8999999761581);
}
