use std::path::{Path, PathBuf};

use navigator::{GraphBackend, GraphManager, ThemeLoader};

/// Small catalog used by the manager and checkpoint tests: four themes over
/// three domains, one dependency chain, slots on one scene theme.
pub const FIXTURE_CATALOG: &str = r#"{
    "domains": {
        "life_chapters": {
            "themes": [
                {
                    "theme_id": "THEME_01",
                    "title": "Life chapters",
                    "description": "The table of contents of the life story",
                    "seed_questions": ["How would you divide your life into chapters?"],
                    "priority": 1
                }
            ]
        },
        "key_scenes": {
            "themes": [
                {
                    "theme_id": "THEME_02",
                    "title": "High point",
                    "description": "The best moment of the story",
                    "seed_questions": ["What was the happiest moment of your life?"],
                    "priority": 2,
                    "depends_on": ["THEME_01"],
                    "slots": ["time", "place", "people", "emotion"]
                },
                {
                    "theme_id": "THEME_03",
                    "title": "Low point",
                    "description": "The worst moment of the story",
                    "priority": 3
                }
            ]
        },
        "challenges": {
            "themes": [
                {
                    "theme_id": "THEME_04",
                    "title": "Greatest challenge",
                    "description": "The hardest thing ever faced",
                    "priority": 2
                }
            ]
        }
    }
}"#;

pub fn write_fixture_catalog(dir: &Path) -> PathBuf {
    let path = dir.join("themes.json");
    std::fs::write(&path, FIXTURE_CATALOG).expect("write fixture catalog");
    path
}

pub fn fixture_manager(dir: &Path, backend: GraphBackend) -> GraphManager {
    let path = write_fixture_catalog(dir);
    GraphManager::new(ThemeLoader::new(path), backend).expect("build manager")
}
