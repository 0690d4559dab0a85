//! Field alias tables for schema-drift tolerance.
//!
//! Each record kind has one table mapping a canonical field name to the
//! legacy names older producers used for it, in priority order. The loader
//! resolves every field through [`AliasTable::resolve`]; nothing else in the
//! crate knows about legacy names.

use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy)]
pub struct FieldAlias {
    pub canonical: &'static str,
    /// Tried in order after `canonical`.
    pub legacy: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
pub struct AliasTable {
    pub kind: &'static str,
    pub fields: &'static [FieldAlias],
}

impl AliasTable {
    /// Source names for `canonical`, canonical first.
    ///
    /// A field missing from the table resolves from its canonical name only.
    pub fn sources(&self, canonical: &'static str) -> impl Iterator<Item = &'static str> {
        let legacy: &'static [&'static str] = self
            .fields
            .iter()
            .find(|f| f.canonical == canonical)
            .map(|f| f.legacy)
            .unwrap_or(&[]);
        std::iter::once(canonical).chain(legacy.iter().copied())
    }

    /// First non-null value for `canonical` in priority order.
    pub fn resolve<'a>(&self, obj: &'a Map<String, Value>, canonical: &'static str) -> Option<&'a Value> {
        self.resolve_with(obj, canonical, Some)
    }

    /// First value for `canonical` that `convert` accepts, in priority order.
    ///
    /// A present but unusable modern value falls through to the legacy names.
    pub fn resolve_with<'a, T>(
        &self,
        obj: &'a Map<String, Value>,
        canonical: &'static str,
        convert: impl Fn(&'a Value) -> Option<T>,
    ) -> Option<T> {
        self.sources(canonical)
            .filter_map(|name| obj.get(name))
            .filter(|value| !value.is_null())
            .find_map(convert)
    }
}

pub const IFRAME_FIELDS: AliasTable = AliasTable {
    kind: "iframe",
    fields: &[
        FieldAlias { canonical: "id", legacy: &["frameId", "name"] },
        FieldAlias { canonical: "src", legacy: &["url"] },
        FieldAlias { canonical: "bbox", legacy: &["boundingBox", "rect"] },
        FieldAlias { canonical: "zIndex", legacy: &["z_index"] },
        FieldAlias { canonical: "visibility", legacy: &["cssVisibility"] },
        FieldAlias { canonical: "opacity", legacy: &[] },
        FieldAlias { canonical: "areaPctOfViewport", legacy: &["viewportCoveragePct", "coveragePct"] },
        FieldAlias { canonical: "overlapPct", legacy: &["overlaps", "overlapPercentages"] },
        FieldAlias { canonical: "isTiny", legacy: &["tinyFlag"] },
        FieldAlias { canonical: "isHidden", legacy: &["hiddenFlag", "notVisible"] },
        FieldAlias { canonical: "isAd", legacy: &["adFlag", "isAdFrame"] },
    ],
};

pub const BBOX_FIELDS: AliasTable = AliasTable {
    kind: "bbox",
    fields: &[
        FieldAlias { canonical: "x", legacy: &["left"] },
        FieldAlias { canonical: "y", legacy: &["top"] },
        FieldAlias { canonical: "width", legacy: &["w"] },
        FieldAlias { canonical: "height", legacy: &["h"] },
    ],
};

pub const TAG_FIELDS: AliasTable = AliasTable {
    kind: "tag",
    fields: &[
        FieldAlias { canonical: "id", legacy: &["tagId", "name"] },
        FieldAlias { canonical: "type", legacy: &["tagType", "kind"] },
        FieldAlias { canonical: "name", legacy: &["tagName"] },
        FieldAlias { canonical: "containerId", legacy: &["container", "gtmContainer"] },
        FieldAlias { canonical: "triggers", legacy: &["triggerIds", "firingTriggers"] },
        FieldAlias { canonical: "fired", legacy: &["didFire", "hasFired"] },
        FieldAlias { canonical: "originUrls", legacy: &["urls", "requestUrls"] },
    ],
};

pub const GPT_EVENT_FIELDS: AliasTable = AliasTable {
    kind: "gpt_event",
    fields: &[
        FieldAlias { canonical: "timestamp", legacy: &["ts", "time"] },
        FieldAlias { canonical: "type", legacy: &["eventType", "event"] },
        FieldAlias { canonical: "slotId", legacy: &["slotElementId", "slot"] },
        FieldAlias { canonical: "adUnitPath", legacy: &["adUnit"] },
        FieldAlias { canonical: "requestId", legacy: &["reqId"] },
        FieldAlias { canonical: "size", legacy: &["creativeSize"] },
        FieldAlias { canonical: "payload", legacy: &["data", "detail"] },
    ],
};

/// Envelope keys wrapping each array file.
pub const ENVELOPE_FIELDS: AliasTable = AliasTable {
    kind: "envelope",
    fields: &[
        FieldAlias { canonical: "iframes", legacy: &["frames"] },
        FieldAlias { canonical: "tags", legacy: &[] },
        FieldAlias { canonical: "events", legacy: &["gptEvents"] },
    ],
};

pub const ALL_TABLES: [&AliasTable; 5] = [
    &IFRAME_FIELDS,
    &BBOX_FIELDS,
    &TAG_FIELDS,
    &GPT_EVENT_FIELDS,
    &ENVELOPE_FIELDS,
];
