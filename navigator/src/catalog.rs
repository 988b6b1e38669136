use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{NavigatorError, Result};
use crate::models::{Domain, NodeStatus, ThemeNode, DEFAULT_PRIORITY};

const DEFAULT_EXPECTED_DEPTH: u8 = 3;

/// On-disk shape of the theme catalog: a `domains` mapping where each entry
/// carries a list of theme definitions.
#[derive(Debug, Clone, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    domains: BTreeMap<String, DomainEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct DomainEntry {
    #[serde(default)]
    #[allow(dead_code)]
    label: Option<String>,
    #[serde(default)]
    themes: Vec<ThemeDef>,
}

#[derive(Debug, Clone, Deserialize)]
struct ThemeDef {
    theme_id: String,
    title: String,
    description: String,
    #[serde(default)]
    seed_questions: Vec<String>,
    #[serde(default = "default_priority")]
    priority: u8,
    #[serde(default)]
    depends_on: Vec<String>,
    #[serde(default)]
    trigger_logic: Option<serde_json::Value>,
    #[serde(default)]
    slots: Vec<String>,
    #[serde(default)]
    expected_depth: Option<u8>,
}

fn default_priority() -> u8 {
    DEFAULT_PRIORITY
}

/// Per-domain summary of the loaded catalog.
#[derive(Debug, Clone, Serialize)]
pub struct DomainSummary {
    pub label: String,
    pub count: usize,
    pub theme_ids: Vec<String>,
}

/// Loads the externally authored theme catalog and instantiates the full
/// theme-node set. Construction is deterministic and side-effect free; a
/// missing or unparseable catalog is fatal because without themes there is
/// no graph to manage.
#[derive(Debug, Clone)]
pub struct ThemeLoader {
    themes_file: PathBuf,
    themes: BTreeMap<String, ThemeNode>,
}

impl ThemeLoader {
    pub fn new(themes_file: impl Into<PathBuf>) -> Self {
        Self {
            themes_file: themes_file.into(),
            themes: BTreeMap::new(),
        }
    }

    pub fn themes_file(&self) -> &PathBuf {
        &self.themes_file
    }

    /// Read the catalog and build every theme node, forced to Pending
    /// regardless of anything in the definition. Unknown domain keys are
    /// skipped with a warning so older loaders survive experimental domains.
    ///
    /// Returns an owned map for the caller; the loader retains its own copy
    /// for the standalone query helpers.
    pub fn load(&mut self) -> Result<BTreeMap<String, ThemeNode>> {
        let raw = fs::read_to_string(&self.themes_file).map_err(|e| {
            NavigatorError::Catalog(format!(
                "cannot read theme catalog {}: {e}",
                self.themes_file.display()
            ))
        })?;

        let catalog: CatalogFile = serde_json::from_str(&raw).map_err(|e| {
            NavigatorError::Catalog(format!(
                "cannot parse theme catalog {}: {e}",
                self.themes_file.display()
            ))
        })?;

        let mut themes = BTreeMap::new();

        for (domain_key, domain_entry) in &catalog.domains {
            let domain: Domain = match domain_key.parse() {
                Ok(domain) => domain,
                Err(_) => {
                    tracing::warn!("Unknown domain '{}' in catalog, skipping", domain_key);
                    continue;
                }
            };

            for def in &domain_entry.themes {
                let theme = build_theme(def, domain);
                themes.insert(theme.theme_id.clone(), theme);
            }
        }

        tracing::info!("Loaded {} theme nodes from catalog", themes.len());
        self.themes = themes.clone();
        Ok(themes)
    }

    /// Clear and re-load from the same file. No state from the previous
    /// load survives.
    pub fn reload(&mut self) -> Result<BTreeMap<String, ThemeNode>> {
        self.themes.clear();
        self.load()
    }

    pub fn theme_by_id(&self, theme_id: &str) -> Option<&ThemeNode> {
        self.themes.get(theme_id)
    }

    pub fn themes_by_domain(&self, domain: Domain) -> Vec<&ThemeNode> {
        self.themes
            .values()
            .filter(|node| node.domain == domain)
            .collect()
    }

    /// Pending themes whose dependencies are satisfied. When no external
    /// graph state is supplied, readiness is checked against the loader's
    /// own set.
    pub fn pending_themes(
        &self,
        graph_state: Option<&BTreeMap<String, ThemeNode>>,
    ) -> Vec<&ThemeNode> {
        let state = graph_state.unwrap_or(&self.themes);
        self.themes
            .values()
            .filter(|node| {
                node.status == NodeStatus::Pending && node.is_ready_to_explore(Some(state))
            })
            .collect()
    }

    pub fn mentioned_themes(&self) -> Vec<&ThemeNode> {
        self.themes
            .values()
            .filter(|node| node.status == NodeStatus::Mentioned)
            .collect()
    }

    pub fn exhausted_themes(&self) -> Vec<&ThemeNode> {
        self.themes
            .values()
            .filter(|node| node.status == NodeStatus::Exhausted)
            .collect()
    }

    /// Standalone pick of the next theme to explore, using the same
    /// two-phase rule as the graph manager: any Mentioned theme with the
    /// lowest completion ratio first, otherwise the ready Pending theme
    /// with the lowest priority number. Ties break by natural id order.
    pub fn next_priority_theme(
        &self,
        graph_state: Option<&BTreeMap<String, ThemeNode>>,
    ) -> Option<&ThemeNode> {
        let state = graph_state.unwrap_or(&self.themes);

        let mut best_mentioned: Option<(&ThemeNode, f64)> = None;
        for node in self.themes.values() {
            if node.status != NodeStatus::Mentioned {
                continue;
            }
            let ratio = node.completion_ratio();
            // Strict comparison keeps the first theme in id order on ties.
            if best_mentioned.map_or(true, |(_, best)| ratio < best) {
                best_mentioned = Some((node, ratio));
            }
        }
        if let Some((node, _)) = best_mentioned {
            return Some(node);
        }

        let mut best_pending: Option<&ThemeNode> = None;
        for node in self.themes.values() {
            if node.status != NodeStatus::Pending || !node.is_ready_to_explore(Some(state)) {
                continue;
            }
            if best_pending.map_or(true, |best| node.priority < best.priority) {
                best_pending = Some(node);
            }
        }
        best_pending
    }

    pub fn all_themes(&self) -> &BTreeMap<String, ThemeNode> {
        &self.themes
    }

    pub fn theme_count(&self) -> usize {
        self.themes.len()
    }

    pub fn domains_summary(&self) -> BTreeMap<String, DomainSummary> {
        let mut summary = BTreeMap::new();
        for domain in Domain::ALL {
            let themes = self.themes_by_domain(domain);
            summary.insert(
                domain.to_string(),
                DomainSummary {
                    label: domain.to_string(),
                    count: themes.len(),
                    theme_ids: themes.iter().map(|t| t.theme_id.clone()).collect(),
                },
            );
        }
        summary
    }
}

fn build_theme(def: &ThemeDef, domain: Domain) -> ThemeNode {
    let mut theme = ThemeNode::new(
        def.theme_id.clone(),
        domain,
        def.title.clone(),
        def.description.clone(),
    );
    theme.seed_questions = def.seed_questions.clone();
    theme.priority = def.priority;
    theme.depends_on = def.depends_on.clone();
    theme.trigger_logic = def.trigger_logic.clone();
    theme.slots_filled = def
        .slots
        .iter()
        .map(|slot| (slot.clone(), false))
        .collect();
    theme.metadata.insert(
        "expected_depth".to_string(),
        serde_json::json!(def.expected_depth.unwrap_or(DEFAULT_EXPECTED_DEPTH)),
    );
    theme
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_catalog(json: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("themes.json");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(json.as_bytes()).unwrap();
        (dir, path)
    }

    const SMALL_CATALOG: &str = r#"{
        "domains": {
            "life_chapters": {
                "label": "Life chapters",
                "themes": [
                    {
                        "theme_id": "THEME_01_LIFE_CHAPTERS",
                        "title": "Life chapters",
                        "description": "The table of contents of the life story",
                        "seed_questions": ["How would you divide your life into chapters?"],
                        "priority": 1,
                        "expected_depth": 4
                    }
                ]
            },
            "key_scenes": {
                "themes": [
                    {
                        "theme_id": "THEME_02_HIGH_POINT",
                        "title": "High point",
                        "description": "The best moment of the story",
                        "slots": ["time", "place", "emotion"],
                        "depends_on": ["THEME_01_LIFE_CHAPTERS"],
                        "status": "exhausted"
                    }
                ]
            },
            "astral_projection": {
                "themes": [
                    {
                        "theme_id": "THEME_98_UNKNOWN",
                        "title": "Unknown",
                        "description": "Lives in an unknown domain"
                    }
                ]
            }
        }
    }"#;

    #[test]
    fn test_load_skips_unknown_domains() {
        let (_dir, path) = write_catalog(SMALL_CATALOG);
        let mut loader = ThemeLoader::new(&path);
        let themes = loader.load().unwrap();

        assert_eq!(themes.len(), 2);
        assert!(!themes.contains_key("THEME_98_UNKNOWN"));
    }

    #[test]
    fn test_load_forces_pending_and_defaults() {
        let (_dir, path) = write_catalog(SMALL_CATALOG);
        let mut loader = ThemeLoader::new(&path);
        let themes = loader.load().unwrap();

        // "status": "exhausted" in the definition is ignored.
        let scene = &themes["THEME_02_HIGH_POINT"];
        assert_eq!(scene.status, NodeStatus::Pending);
        assert_eq!(scene.priority, DEFAULT_PRIORITY);
        assert_eq!(scene.exploration_depth, 0);
        assert_eq!(scene.slots_filled.len(), 3);
        assert!(scene.slots_filled.values().all(|filled| !filled));
        assert_eq!(scene.depends_on, vec!["THEME_01_LIFE_CHAPTERS"]);

        let chapters = &themes["THEME_01_LIFE_CHAPTERS"];
        assert_eq!(chapters.priority, 1);
        assert_eq!(
            chapters.metadata.get("expected_depth"),
            Some(&serde_json::json!(4))
        );
    }

    #[test]
    fn test_missing_catalog_is_fatal() {
        let mut loader = ThemeLoader::new("/nonexistent/themes.json");
        let err = loader.load().unwrap_err();
        assert!(matches!(err, NavigatorError::Catalog(_)));
    }

    #[test]
    fn test_unparseable_catalog_is_fatal() {
        let (_dir, path) = write_catalog("{ not json");
        let mut loader = ThemeLoader::new(&path);
        assert!(matches!(
            loader.load().unwrap_err(),
            NavigatorError::Catalog(_)
        ));
    }

    #[test]
    fn test_reload_drops_mutated_state() {
        let (_dir, path) = write_catalog(SMALL_CATALOG);
        let mut loader = ThemeLoader::new(&path);
        loader.load().unwrap();

        // Mutate the retained copy, then reload: the mutation must not leak.
        if let Some(t) = loader.themes.get_mut("THEME_01_LIFE_CHAPTERS") {
            t.mark_mentioned();
            t.increment_depth();
        }
        assert_eq!(loader.mentioned_themes().len(), 1);

        loader.reload().unwrap();
        assert_eq!(loader.mentioned_themes().len(), 0);
        let chapters = loader.theme_by_id("THEME_01_LIFE_CHAPTERS").unwrap();
        assert_eq!(chapters.status, NodeStatus::Pending);
        assert_eq!(chapters.exploration_depth, 0);
    }

    #[test]
    fn test_next_priority_theme_prefers_mentioned() {
        let (_dir, path) = write_catalog(
            r#"{
            "domains": {
                "challenges": {
                    "themes": [
                        {"theme_id": "T_A", "title": "A", "description": "a", "priority": 3},
                        {"theme_id": "T_B", "title": "B", "description": "b", "priority": 3}
                    ]
                }
            }
        }"#,
        );
        let mut loader = ThemeLoader::new(&path);
        loader.load().unwrap();

        // Natural order wins while both are pending.
        assert_eq!(loader.next_priority_theme(None).unwrap().theme_id, "T_A");

        loader.themes.get_mut("T_B").unwrap().mark_mentioned();
        assert_eq!(loader.next_priority_theme(None).unwrap().theme_id, "T_B");
    }

    #[test]
    fn test_domains_summary_counts() {
        let (_dir, path) = write_catalog(SMALL_CATALOG);
        let mut loader = ThemeLoader::new(&path);
        loader.load().unwrap();

        let summary = loader.domains_summary();
        assert_eq!(summary["life_chapters"].count, 1);
        assert_eq!(summary["key_scenes"].count, 1);
        assert_eq!(summary["future_scripts"].count, 0);
        assert_eq!(
            summary["key_scenes"].theme_ids,
            vec!["THEME_02_HIGH_POINT"]
        );
    }
}
