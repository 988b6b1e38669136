use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::ThemeLoader;
use crate::config::{Config, GraphBackend};
use crate::error::{NavigatorError, Result};
use crate::models::{Completion, EventNode, NodeStatus, ThemeNode, MAX_DEPTH_LEVEL};

use super::store::{build_store, EdgeRelation, GraphSnapshot, GraphStore, NodeKind};

pub const GRAPH_STATE_FILE: &str = "graph_state.json";
pub const THEMES_STATE_FILE: &str = "themes_state.json";
pub const EVENTS_FILE: &str = "events.json";

/// Coverage metrics, recomputed fresh on every call.
#[derive(Debug, Clone, Serialize)]
pub struct Coverage {
    pub overall: f64,
    pub by_domain: BTreeMap<String, f64>,
}

/// Per-theme status snapshot for the conversational collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct ThemeStatus {
    pub theme_id: String,
    pub title: String,
    pub status: NodeStatus,
    pub completion_ratio: f64,
    pub exploration_depth: u8,
    pub slots_filled: BTreeMap<String, bool>,
    pub extracted_events_count: usize,
    pub has_more_questions: bool,
}

/// Whole-graph summary.
#[derive(Debug, Clone, Serialize)]
pub struct GraphSummary {
    pub coverage: Coverage,
    pub theme_count: usize,
    pub event_count: usize,
    pub pending_themes: usize,
    pub mentioned_themes: usize,
    pub exhausted_themes: usize,
    pub timestamp: DateTime<Utc>,
}

/// Checkpoint contents parsed but not yet applied. Everything is read into
/// this staging form first so a failed load leaves the live graph untouched.
struct StagedCheckpoint {
    snapshot: GraphSnapshot,
    themes: BTreeMap<String, ThemeNode>,
    events: BTreeMap<String, EventNode>,
}

/// Orchestrator over the theme/event collections for one interview session.
///
/// Owns the live nodes, maintains the dependency+containment graph, computes
/// coverage, selects the next theme to pursue, and persists progress.
/// Single-threaded by design: one manager per session, calls serialized by
/// the caller.
#[derive(Debug)]
pub struct GraphManager {
    loader: ThemeLoader,
    store: Box<dyn GraphStore>,
    checkpoint_dir: PathBuf,
    themes: BTreeMap<String, ThemeNode>,
    events: BTreeMap<String, EventNode>,
}

impl GraphManager {
    /// Build a manager from a loader and the configured graph backend.
    /// Fatal if the catalog cannot be loaded.
    pub fn new(loader: ThemeLoader, backend: GraphBackend) -> Result<Self> {
        let mut manager = Self {
            loader,
            store: build_store(backend),
            checkpoint_dir: PathBuf::from("data/interviews"),
            themes: BTreeMap::new(),
            events: BTreeMap::new(),
        };
        manager.initialize_graph()?;
        tracing::info!("Graph manager ready ({:?} backend)", backend);
        Ok(manager)
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let loader = ThemeLoader::new(&config.catalog.path);
        let mut manager = Self::new(loader, config.graph.backend)?;
        manager.checkpoint_dir = config.checkpoints.dir.clone();
        Ok(manager)
    }

    /// Bootstrap: one theme node per catalog entry, one dependency edge per
    /// declared prerequisite that exists in the catalog.
    fn initialize_graph(&mut self) -> Result<()> {
        self.themes = self.loader.load()?;
        self.store.clear();

        for theme_id in self.themes.keys() {
            self.store
                .add_node(theme_id, NodeKind::Theme, &NodeStatus::Pending.to_string());
        }
        for (theme_id, theme) in &self.themes {
            for dep_id in &theme.depends_on {
                if self.themes.contains_key(dep_id) {
                    self.store.add_edge(dep_id, theme_id, EdgeRelation::Dependency);
                }
            }
        }

        tracing::info!("Graph initialized with {} theme nodes", self.themes.len());
        Ok(())
    }

    /// Record an extracted event under `theme_id`.
    ///
    /// This is the single path by which theme depth advances from
    /// conversational content. Fails (false) on an unknown theme, leaving
    /// the event collection untouched.
    pub fn add_event_node(&mut self, event: EventNode, theme_id: &str) -> bool {
        if !self.themes.contains_key(theme_id) {
            tracing::warn!("Unknown theme: {theme_id}");
            return false;
        }

        let event_id = event.event_id.clone();
        self.events.insert(event_id.clone(), event);

        self.store.add_node(&event_id, NodeKind::Event, "active");
        self.store.add_edge(theme_id, &event_id, EdgeRelation::Contains);

        if let Some(theme) = self.themes.get_mut(theme_id) {
            theme.add_extracted_event(&event_id);
            theme.increment_depth();
            if theme.status == NodeStatus::Pending {
                theme.mark_mentioned();
                self.store
                    .set_status(theme_id, &NodeStatus::Mentioned.to_string());
            }
        }

        tracing::debug!("Added event node: {event_id} -> {theme_id}");
        true
    }

    /// Set an event's probing depth, clamped to the cap. False on an
    /// unknown event id.
    pub fn update_event_depth(&mut self, event_id: &str, new_depth: u8) -> bool {
        match self.events.get_mut(event_id) {
            Some(event) => {
                event.depth_level = new_depth.min(MAX_DEPTH_LEVEL);
                true
            }
            None => false,
        }
    }

    /// Force a theme to Exhausted. False on an unknown theme id.
    pub fn mark_theme_exhausted(&mut self, theme_id: &str, kind: Completion) -> bool {
        match self.themes.get_mut(theme_id) {
            Some(theme) => {
                theme.mark_exhausted(kind);
                self.store
                    .set_status(theme_id, &NodeStatus::Exhausted.to_string());
                tracing::info!("Theme exhausted ({kind:?}): {theme_id}");
                true
            }
            None => {
                tracing::warn!("Unknown theme: {theme_id}");
                false
            }
        }
    }

    /// Mean completion ratio across all themes, overall and per domain.
    /// Never cached.
    pub fn calculate_coverage(&self) -> Coverage {
        if self.themes.is_empty() {
            return Coverage {
                overall: 0.0,
                by_domain: BTreeMap::new(),
            };
        }

        let mut total = 0.0;
        let mut domain_totals: BTreeMap<String, (f64, usize)> = BTreeMap::new();

        for theme in self.themes.values() {
            let completion = theme.completion_ratio();
            total += completion;
            let entry = domain_totals.entry(theme.domain.to_string()).or_default();
            entry.0 += completion;
            entry.1 += 1;
        }

        Coverage {
            overall: total / self.themes.len() as f64,
            by_domain: domain_totals
                .into_iter()
                .map(|(domain, (sum, count))| (domain, sum / count as f64))
                .collect(),
        }
    }

    pub fn pending_themes(&self) -> Vec<&ThemeNode> {
        self.themes_with_status(NodeStatus::Pending)
    }

    pub fn mentioned_themes(&self) -> Vec<&ThemeNode> {
        self.themes_with_status(NodeStatus::Mentioned)
    }

    pub fn exhausted_themes(&self) -> Vec<&ThemeNode> {
        self.themes_with_status(NodeStatus::Exhausted)
    }

    fn themes_with_status(&self, status: NodeStatus) -> Vec<&ThemeNode> {
        self.themes
            .values()
            .filter(|node| node.status == status)
            .collect()
    }

    /// Two-phase greedy pick of the next theme to pursue.
    ///
    /// 1. Any Mentioned theme exists: the one with the lowest completion
    ///    ratio; unfinished threads beat opening new ones.
    /// 2. Otherwise the ready Pending theme with the lowest priority number.
    ///
    /// Ties break by natural (id) order. `None` means every theme is
    /// Exhausted or dependency-blocked, a legitimate terminal condition.
    /// `current_focus` is a stable hook for locality-aware tie-breaking; it
    /// has no effect in the base algorithm.
    pub fn get_next_candidate_theme(&self, _current_focus: Option<&str>) -> Option<&ThemeNode> {
        let mut best_mentioned: Option<(&ThemeNode, f64)> = None;
        for node in self.themes.values() {
            if node.status != NodeStatus::Mentioned {
                continue;
            }
            let ratio = node.completion_ratio();
            // Strict comparison keeps the first id on ties.
            if best_mentioned.map_or(true, |(_, best)| ratio < best) {
                best_mentioned = Some((node, ratio));
            }
        }
        if let Some((node, _)) = best_mentioned {
            return Some(node);
        }

        let mut best_pending: Option<(&ThemeNode, u8)> = None;
        for node in self.themes.values() {
            if node.status != NodeStatus::Pending
                || !node.is_ready_to_explore(Some(&self.themes))
            {
                continue;
            }
            if best_pending.map_or(true, |(_, best)| node.priority < best) {
                best_pending = Some((node, node.priority));
            }
        }
        best_pending.map(|(node, _)| node)
    }

    pub fn theme_status(&self, theme_id: &str) -> Option<ThemeStatus> {
        let theme = self.themes.get(theme_id)?;
        Some(ThemeStatus {
            theme_id: theme.theme_id.clone(),
            title: theme.title.clone(),
            status: theme.status,
            completion_ratio: theme.completion_ratio(),
            exploration_depth: theme.exploration_depth,
            slots_filled: theme.slots_filled.clone(),
            extracted_events_count: theme.extracted_events.len(),
            has_more_questions: theme.has_more_questions(),
        })
    }

    pub fn graph_state(&self) -> GraphSummary {
        GraphSummary {
            coverage: self.calculate_coverage(),
            theme_count: self.themes.len(),
            event_count: self.events.len(),
            pending_themes: self.pending_themes().len(),
            mentioned_themes: self.mentioned_themes().len(),
            exhausted_themes: self.exhausted_themes().len(),
            timestamp: Utc::now(),
        }
    }

    pub fn theme(&self, theme_id: &str) -> Option<&ThemeNode> {
        self.themes.get(theme_id)
    }

    pub fn theme_mut(&mut self, theme_id: &str) -> Option<&mut ThemeNode> {
        self.themes.get_mut(theme_id)
    }

    pub fn event(&self, event_id: &str) -> Option<&EventNode> {
        self.events.get(event_id)
    }

    pub fn themes(&self) -> &BTreeMap<String, ThemeNode> {
        &self.themes
    }

    pub fn events(&self) -> &BTreeMap<String, EventNode> {
        &self.events
    }

    /// Serializable view of the raw graph structure, for checkpoints and
    /// visualization collaborators.
    pub fn graph_snapshot(&self) -> GraphSnapshot {
        self.store.snapshot()
    }

    fn session_dir(&self, session_id: &str, dir: Option<&Path>) -> PathBuf {
        dir.map(Path::to_path_buf)
            .unwrap_or_else(|| self.checkpoint_dir.clone())
            .join(session_id)
    }

    /// Write the three checkpoint records for this session. Creates the
    /// session directory; each file lands via temp-file + rename so a
    /// concurrent reader never observes a half-written file. Any failure is
    /// logged and reported as false; a failed checkpoint must not abort an
    /// in-progress interview.
    pub fn save_checkpoint(&self, session_id: &str, dir: Option<&Path>) -> bool {
        let session_dir = self.session_dir(session_id, dir);
        match self.write_checkpoint(&session_dir) {
            Ok(()) => {
                tracing::info!("Checkpoint saved to {}", session_dir.display());
                true
            }
            Err(e) => {
                tracing::error!(
                    "Failed to save checkpoint to {}: {e}",
                    session_dir.display()
                );
                false
            }
        }
    }

    fn write_checkpoint(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        write_json_atomic(&dir.join(GRAPH_STATE_FILE), &self.store.snapshot())?;
        write_json_atomic(&dir.join(THEMES_STATE_FILE), &self.themes)?;
        write_json_atomic(&dir.join(EVENTS_FILE), &self.events)?;
        Ok(())
    }

    /// Restore a session's progress. A missing checkpoint is a non-fatal
    /// not-found (false); any read or parse failure is logged and reported
    /// as false, with the in-memory graph left unchanged either way.
    ///
    /// Themes present in the records but absent from the current catalog are
    /// silently ignored, so catalog changes between sessions never crash a
    /// restore.
    pub fn load_checkpoint(&mut self, session_id: &str, dir: Option<&Path>) -> bool {
        let session_dir = self.session_dir(session_id, dir);
        let staged = match read_checkpoint(&session_dir) {
            Ok(staged) => staged,
            Err(NavigatorError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Checkpoint not found: {}", session_dir.display());
                return false;
            }
            Err(e) => {
                tracing::error!(
                    "Failed to load checkpoint from {}: {e}",
                    session_dir.display()
                );
                return false;
            }
        };

        self.store.restore(&staged.snapshot);

        for (theme_id, restored) in staged.themes {
            if let Some(theme) = self.themes.get_mut(&theme_id) {
                theme.status = restored.status;
                theme.exploration_depth = restored.exploration_depth;
                theme.slots_filled = restored.slots_filled;
                theme.current_question_index = restored.current_question_index;
                theme.first_mentioned_at = restored.first_mentioned_at;
                theme.exhausted_at = restored.exhausted_at;
                theme.completed_via = restored.completed_via;
            }
        }

        self.events = staged.events;

        // Re-derive the theme -> event containment lists from the restored
        // events, keeping the bidirectional invariant intact even in a
        // freshly constructed manager.
        let event_ids: Vec<(String, String)> = self
            .events
            .values()
            .map(|event| (event.theme_id.clone(), event.event_id.clone()))
            .collect();
        for (theme_id, event_id) in event_ids {
            if let Some(theme) = self.themes.get_mut(&theme_id) {
                theme.add_extracted_event(event_id);
            }
        }

        tracing::info!("Checkpoint loaded from {}", session_dir.display());
        true
    }

    /// Discard all events and re-run the bootstrap, yielding a graph
    /// identical to a freshly constructed one from the same catalog.
    pub fn reset(&mut self) -> Result<()> {
        self.events.clear();
        self.initialize_graph()?;
        tracing::info!("Graph reset");
        Ok(())
    }
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn read_checkpoint(dir: &Path) -> Result<StagedCheckpoint> {
    Ok(StagedCheckpoint {
        snapshot: read_json(&dir.join(GRAPH_STATE_FILE))?,
        themes: read_json(&dir.join(THEMES_STATE_FILE))?,
        events: read_json(&dir.join(EVENTS_FILE))?,
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
