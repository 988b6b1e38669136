use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Completion, Domain, NodeStatus, NodeStyle};

pub const MAX_EXPLORATION_DEPTH: u8 = 5;
pub const DEFAULT_PRIORITY: u8 = 5;

/// A predefined topic of biographical inquiry.
///
/// Theme nodes are the fixed outline of the interview: they exist from the
/// moment the catalog is loaded and only their exploration state changes.
/// Status moves one way only: Pending -> Mentioned -> Exhausted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "ThemeRecord", from = "ThemeRecord")]
pub struct ThemeNode {
    pub theme_id: String,
    pub domain: Domain,
    pub title: String,
    pub description: String,

    pub seed_questions: Vec<String>,
    pub current_question_index: usize,

    pub status: NodeStatus,

    /// How deep the conversation has gone into this theme, 0..=5.
    pub exploration_depth: u8,
    pub slots_filled: BTreeMap<String, bool>,
    /// Ids of events extracted under this theme. Maintained by the graph
    /// manager, deduplicated on insert.
    pub extracted_events: Vec<String>,

    pub trigger_logic: Option<serde_json::Value>,
    /// Lower number = more urgent. 1 is the most urgent.
    pub priority: u8,
    /// Theme ids that must be Exhausted before this theme is ready.
    pub depends_on: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub first_mentioned_at: Option<DateTime<Utc>>,
    pub exhausted_at: Option<DateTime<Utc>>,
    pub completed_via: Option<Completion>,

    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl ThemeNode {
    pub fn new(
        theme_id: impl Into<String>,
        domain: Domain,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            theme_id: theme_id.into(),
            domain,
            title: title.into(),
            description: description.into(),
            seed_questions: Vec::new(),
            current_question_index: 0,
            status: NodeStatus::Pending,
            exploration_depth: 0,
            slots_filled: BTreeMap::new(),
            extracted_events: Vec::new(),
            trigger_logic: None,
            priority: DEFAULT_PRIORITY,
            depends_on: Vec::new(),
            created_at: Utc::now(),
            first_mentioned_at: None,
            exhausted_at: None,
            completed_via: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Transition Pending -> Mentioned. A no-op in any other state, so the
    /// first-mention timestamp is recorded exactly once.
    pub fn mark_mentioned(&mut self) {
        if self.status == NodeStatus::Pending {
            self.status = NodeStatus::Mentioned;
            self.first_mentioned_at = Some(Utc::now());
        }
    }

    /// Force the theme to Exhausted from any state, recording whether the
    /// completion was natural or imposed from outside (e.g. a session
    /// timeout). There is deliberately no Mentioned precondition.
    pub fn mark_exhausted(&mut self, kind: Completion) {
        self.status = NodeStatus::Exhausted;
        self.exhausted_at = Some(Utc::now());
        self.completed_via = Some(kind);
    }

    /// Completion ratio in [0, 1].
    ///
    /// When the theme tracks slots and at least one is filled, the ratio is
    /// filled/total; otherwise it falls back to exploration depth over the
    /// depth cap.
    pub fn completion_ratio(&self) -> f64 {
        if !self.slots_filled.is_empty() {
            let filled = self.slots_filled.values().filter(|v| **v).count();
            if filled > 0 {
                return filled as f64 / self.slots_filled.len() as f64;
            }
        }
        (f64::from(self.exploration_depth) / f64::from(MAX_EXPLORATION_DEPTH)).min(1.0)
    }

    /// Whether every dependency of this theme is Exhausted.
    ///
    /// A theme with dependencies and no graph state to check them against is
    /// not ready: the check fails closed.
    pub fn is_ready_to_explore(
        &self,
        graph_state: Option<&BTreeMap<String, ThemeNode>>,
    ) -> bool {
        if self.depends_on.is_empty() {
            return true;
        }
        let Some(state) = graph_state else {
            return false;
        };
        self.depends_on.iter().all(|dep_id| {
            state
                .get(dep_id)
                .is_some_and(|dep| dep.status == NodeStatus::Exhausted)
        })
    }

    /// Return the seed question at the cursor and advance it. Once past the
    /// end, keeps returning `None` -- no wraparound.
    pub fn next_seed_question(&mut self) -> Option<String> {
        if self.current_question_index < self.seed_questions.len() {
            let question = self.seed_questions[self.current_question_index].clone();
            self.current_question_index += 1;
            Some(question)
        } else {
            None
        }
    }

    pub fn has_more_questions(&self) -> bool {
        self.current_question_index < self.seed_questions.len()
    }

    pub fn reset_question_index(&mut self) {
        self.current_question_index = 0;
    }

    pub fn increment_depth(&mut self) {
        self.exploration_depth = (self.exploration_depth + 1).min(MAX_EXPLORATION_DEPTH);
    }

    pub fn update_slot(&mut self, slot_name: impl Into<String>, filled: bool) {
        self.slots_filled.insert(slot_name.into(), filled);
    }

    /// Deduplicating insert into the extracted-event list.
    pub fn add_extracted_event(&mut self, event_id: impl Into<String>) {
        let event_id = event_id.into();
        if !self.extracted_events.contains(&event_id) {
            self.extracted_events.push(event_id);
        }
    }

    pub fn style(&self) -> NodeStyle {
        NodeStyle::from(self.status)
    }
}

/// Wire form of a theme node. Writes the computed completion ratio and event
/// count alongside the raw fields; tolerates records missing any optional
/// field on the way back in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeRecord {
    pub theme_id: String,
    pub domain: Domain,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub seed_questions: Vec<String>,
    #[serde(default)]
    pub current_question_index: usize,
    #[serde(default)]
    pub status: NodeStatus,
    #[serde(default)]
    pub exploration_depth: u8,
    #[serde(default)]
    pub slots_filled: BTreeMap<String, bool>,
    #[serde(default)]
    pub extracted_events: Vec<String>,
    #[serde(default)]
    pub extracted_events_count: usize,
    #[serde(default)]
    pub trigger_logic: Option<serde_json::Value>,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub completion_ratio: f64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub first_mentioned_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub exhausted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_via: Option<Completion>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

fn default_priority() -> u8 {
    DEFAULT_PRIORITY
}

impl From<ThemeNode> for ThemeRecord {
    fn from(node: ThemeNode) -> Self {
        let completion_ratio = node.completion_ratio();
        Self {
            theme_id: node.theme_id,
            domain: node.domain,
            title: node.title,
            description: node.description,
            seed_questions: node.seed_questions,
            current_question_index: node.current_question_index,
            status: node.status,
            exploration_depth: node.exploration_depth,
            extracted_events_count: node.extracted_events.len(),
            slots_filled: node.slots_filled,
            extracted_events: node.extracted_events,
            trigger_logic: node.trigger_logic,
            priority: node.priority,
            depends_on: node.depends_on,
            completion_ratio,
            created_at: node.created_at,
            first_mentioned_at: node.first_mentioned_at,
            exhausted_at: node.exhausted_at,
            completed_via: node.completed_via,
            metadata: node.metadata,
        }
    }
}

impl From<ThemeRecord> for ThemeNode {
    fn from(record: ThemeRecord) -> Self {
        // completion_ratio and extracted_events_count are derived; they are
        // recomputed from the restored fields rather than trusted.
        Self {
            theme_id: record.theme_id,
            domain: record.domain,
            title: record.title,
            description: record.description,
            seed_questions: record.seed_questions,
            current_question_index: record.current_question_index,
            status: record.status,
            exploration_depth: record.exploration_depth.min(MAX_EXPLORATION_DEPTH),
            slots_filled: record.slots_filled,
            extracted_events: record.extracted_events,
            trigger_logic: record.trigger_logic,
            priority: record.priority,
            depends_on: record.depends_on,
            created_at: record.created_at,
            first_mentioned_at: record.first_mentioned_at,
            exhausted_at: record.exhausted_at,
            completed_via: record.completed_via,
            metadata: record.metadata,
        }
    }
}
