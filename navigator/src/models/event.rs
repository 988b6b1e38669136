use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MAX_DEPTH_LEVEL: u8 = 5;

/// The seven narrative slots every event starts with unless the caller
/// supplies its own map.
pub const DEFAULT_SLOTS: [&str; 7] = [
    "time",
    "location",
    "people",
    "cause",
    "result",
    "emotion",
    "reflection",
];

/// Depth at or beyond which an event counts as exhausted.
const EXHAUSTED_DEPTH: u8 = 4;
/// Slot-fill ratio at or beyond which an event counts as exhausted.
const EXHAUSTED_FILL_RATIO: f64 = 0.8;

/// A concrete episode extracted from conversation, owned by exactly one
/// theme. Events are never deleted; they persist for the session's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "EventRecord", from = "EventRecord")]
pub struct EventNode {
    pub event_id: String,
    pub theme_id: String,

    pub title: String,
    pub description: String,

    /// Free-text time anchor, e.g. "the winter of 1992".
    pub time_anchor: Option<String>,
    pub location: Option<String>,

    /// Insertion order preserved, no duplicates.
    pub people_involved: Vec<String>,

    /// Narrative-completeness slots. Unknown slot names are accepted; an
    /// empty string counts as unfilled.
    pub slots: BTreeMap<String, Option<String>>,

    /// Emotional energy in [-1, 1].
    pub emotional_score: f64,
    /// Information density in [0, 1].
    pub information_density: f64,

    /// Probing depth, 0..=5.
    pub depth_level: u8,

    /// Related event ids. Linked one-directionally by whichever call site
    /// makes the connection; no automatic back-link.
    pub related_events: Vec<String>,

    pub created_at: DateTime<Utc>,
}

fn generate_event_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("evt_{}", &hex[..12])
}

fn default_slots() -> BTreeMap<String, Option<String>> {
    DEFAULT_SLOTS
        .iter()
        .map(|name| (name.to_string(), None))
        .collect()
}

impl EventNode {
    /// Build an event under `theme_id`.
    ///
    /// `event_id: None` generates a fresh `evt_<hex>` id. `slots: None`
    /// seeds the seven default narrative slots; `Some(map)` is kept verbatim
    /// even when empty, so a caller can opt out of slot tracking.
    pub fn new(
        event_id: Option<String>,
        theme_id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        slots: Option<BTreeMap<String, Option<String>>>,
    ) -> Self {
        Self {
            event_id: event_id.unwrap_or_else(generate_event_id),
            theme_id: theme_id.into(),
            title: title.into(),
            description: description.into(),
            time_anchor: None,
            location: None,
            people_involved: Vec::new(),
            slots: slots.unwrap_or_else(default_slots),
            emotional_score: 0.0,
            information_density: 0.0,
            depth_level: 0,
            related_events: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Fraction of slots holding a non-empty value; 0.0 when the event
    /// tracks no slots.
    pub fn slot_completion_ratio(&self) -> f64 {
        if self.slots.is_empty() {
            return 0.0;
        }
        let filled = self
            .slots
            .values()
            .filter(|v| v.as_deref().is_some_and(|s| !s.is_empty()))
            .count();
        filled as f64 / self.slots.len() as f64
    }

    /// Set a slot value. Unknown slot names are recorded as well; the slot
    /// map is not strictly fixed in practice.
    pub fn update_slot(&mut self, slot_name: impl Into<String>, value: Option<String>) {
        self.slots.insert(slot_name.into(), value);
    }

    /// Deduplicating insert; no-op on an empty name.
    pub fn add_person(&mut self, person_name: impl Into<String>) {
        let person_name = person_name.into();
        if !person_name.is_empty() && !self.people_involved.contains(&person_name) {
            self.people_involved.push(person_name);
        }
    }

    pub fn increment_depth(&mut self) {
        self.depth_level = (self.depth_level + 1).min(MAX_DEPTH_LEVEL);
    }

    /// An event is exhausted once it has been probed deep enough or its
    /// narrative slots are mostly filled.
    pub fn is_exhausted(&self) -> bool {
        self.depth_level >= EXHAUSTED_DEPTH
            || self.slot_completion_ratio() >= EXHAUSTED_FILL_RATIO
    }

    pub fn add_related_event(&mut self, event_id: impl Into<String>) {
        let event_id = event_id.into();
        if !self.related_events.contains(&event_id) {
            self.related_events.push(event_id);
        }
    }
}

/// Wire form of an event. Carries the derived slot-fill ratio and exhaustion
/// flag for downstream readers; both are recomputed on the way back in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(default)]
    pub event_id: String,
    pub theme_id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub time_anchor: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub people_involved: Vec<String>,
    #[serde(default = "default_slots")]
    pub slots: BTreeMap<String, Option<String>>,
    #[serde(default)]
    pub emotional_score: f64,
    #[serde(default)]
    pub information_density: f64,
    #[serde(default)]
    pub depth_level: u8,
    #[serde(default)]
    pub slot_completion_ratio: f64,
    #[serde(default)]
    pub related_events: Vec<String>,
    #[serde(default)]
    pub is_exhausted: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl From<EventNode> for EventRecord {
    fn from(node: EventNode) -> Self {
        let slot_completion_ratio = node.slot_completion_ratio();
        let is_exhausted = node.is_exhausted();
        Self {
            event_id: node.event_id,
            theme_id: node.theme_id,
            title: node.title,
            description: node.description,
            time_anchor: node.time_anchor,
            location: node.location,
            people_involved: node.people_involved,
            slots: node.slots,
            emotional_score: node.emotional_score,
            information_density: node.information_density,
            depth_level: node.depth_level,
            slot_completion_ratio,
            related_events: node.related_events,
            is_exhausted,
            created_at: node.created_at,
        }
    }
}

impl From<EventRecord> for EventNode {
    fn from(record: EventRecord) -> Self {
        Self {
            event_id: if record.event_id.is_empty() {
                generate_event_id()
            } else {
                record.event_id
            },
            theme_id: record.theme_id,
            title: record.title,
            description: record.description,
            time_anchor: record.time_anchor,
            location: record.location,
            people_involved: record.people_involved,
            slots: record.slots,
            emotional_score: record.emotional_score,
            information_density: record.information_density,
            depth_level: record.depth_level.min(MAX_DEPTH_LEVEL),
            related_events: record.related_events,
            created_at: record.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> EventNode {
        EventNode::new(
            None,
            "THEME_02_HIGH_POINT",
            "Graduation day",
            "Walked the stage as the first in the family to finish university",
            None,
        )
    }

    #[test]
    fn test_generated_id_shape() {
        let event = sample_event();
        assert!(event.event_id.starts_with("evt_"));
        assert_eq!(event.event_id.len(), "evt_".len() + 12);

        let other = sample_event();
        assert_ne!(event.event_id, other.event_id);
    }

    #[test]
    fn test_default_slots_seeded() {
        let event = sample_event();
        assert_eq!(event.slots.len(), DEFAULT_SLOTS.len());
        for name in DEFAULT_SLOTS {
            assert_eq!(event.slots.get(name), Some(&None));
        }
        assert_eq!(event.slot_completion_ratio(), 0.0);
    }

    #[test]
    fn test_empty_slot_map_is_respected() {
        let event = EventNode::new(
            Some("evt_no_slots".to_string()),
            "THEME_01_LIFE_CHAPTERS",
            "Untracked",
            "An event that opts out of slot tracking",
            Some(BTreeMap::new()),
        );
        assert!(event.slots.is_empty());
        assert_eq!(event.slot_completion_ratio(), 0.0);
    }

    #[test]
    fn test_update_slot_accepts_unknown_names() {
        let mut event = sample_event();
        event.update_slot("weather", Some("snowing".to_string()));
        assert_eq!(event.slots.len(), DEFAULT_SLOTS.len() + 1);
        assert_eq!(
            event.slots.get("weather"),
            Some(&Some("snowing".to_string()))
        );
    }

    #[test]
    fn test_empty_string_slot_counts_as_unfilled() {
        let mut event = sample_event();
        event.update_slot("time", Some(String::new()));
        assert_eq!(event.slot_completion_ratio(), 0.0);
        event.update_slot("time", Some("June 2003".to_string()));
        assert!(event.slot_completion_ratio() > 0.0);
    }

    #[test]
    fn test_add_person_deduplicates_and_skips_empty() {
        let mut event = sample_event();
        event.add_person("Mum");
        event.add_person("");
        event.add_person("Mum");
        event.add_person("Professor Lang");
        assert_eq!(event.people_involved, vec!["Mum", "Professor Lang"]);
    }

    #[test]
    fn test_exhaustion_by_depth_or_fill() {
        let mut event = sample_event();
        assert!(!event.is_exhausted());

        for _ in 0..4 {
            event.increment_depth();
        }
        assert!(event.is_exhausted());

        let mut by_fill = sample_event();
        for name in ["time", "location", "people", "cause", "result", "emotion"] {
            by_fill.update_slot(name, Some("filled".to_string()));
        }
        // 6/7 filled >= 0.8
        assert!(by_fill.is_exhausted());
    }

    #[test]
    fn test_depth_saturates_at_cap() {
        let mut event = sample_event();
        for _ in 0..9 {
            event.increment_depth();
        }
        assert_eq!(event.depth_level, MAX_DEPTH_LEVEL);
    }

    #[test]
    fn test_add_related_event_deduplicates() {
        let mut event = sample_event();
        event.add_related_event("evt_x");
        event.add_related_event("evt_x");
        event.add_related_event("evt_y");
        assert_eq!(event.related_events, vec!["evt_x", "evt_y"]);
    }

    #[test]
    fn test_serde_round_trip() {
        let mut event = sample_event();
        event.time_anchor = Some("June 2003".to_string());
        event.add_person("Mum");
        event.update_slot("time", Some("June 2003".to_string()));
        event.emotional_score = 0.9;
        event.increment_depth();

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"slot_completion_ratio\""));
        assert!(json.contains("\"is_exhausted\":false"));

        let restored: EventNode = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.event_id, event.event_id);
        assert_eq!(restored.theme_id, event.theme_id);
        assert_eq!(restored.slots, event.slots);
        assert_eq!(restored.people_involved, event.people_involved);
        assert_eq!(restored.depth_level, 1);
    }

    #[test]
    fn test_deserialize_supplies_defaults() {
        let json = r#"{
            "theme_id": "THEME_02_HIGH_POINT",
            "title": "Graduation day",
            "description": "First in the family to finish university"
        }"#;
        let event: EventNode = serde_json::from_str(json).unwrap();
        assert!(event.event_id.starts_with("evt_"));
        assert_eq!(event.depth_level, 0);
        // A record with no slots key gets the default seven, matching the
        // constructor's sentinel semantics; an explicit empty map survives.
        assert_eq!(event.slots.len(), DEFAULT_SLOTS.len());
        assert!(event.related_events.is_empty());
    }
}
