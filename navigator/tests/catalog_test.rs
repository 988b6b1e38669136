use std::path::PathBuf;

use navigator::{Domain, NodeStatus, ThemeLoader};
use pretty_assertions::assert_eq;

fn shipped_catalog_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/themes/mcadams_themes.json")
}

#[test]
fn shipped_catalog_has_23_themes_across_6_domains() {
    let mut loader = ThemeLoader::new(shipped_catalog_path());
    let themes = loader.load().expect("shipped catalog loads");

    assert_eq!(themes.len(), 23);

    let summary = loader.domains_summary();
    assert_eq!(summary["life_chapters"].count, 1);
    assert_eq!(summary["key_scenes"].count, 8);
    assert_eq!(summary["future_scripts"].count, 3);
    assert_eq!(summary["challenges"].count, 4);
    assert_eq!(summary["personal_ideology"].count, 4);
    assert_eq!(summary["context_management"].count, 3);
}

#[test]
fn shipped_catalog_themes_start_pending_at_zero() {
    let mut loader = ThemeLoader::new(shipped_catalog_path());
    let themes = loader.load().expect("shipped catalog loads");

    for theme in themes.values() {
        assert_eq!(theme.status, NodeStatus::Pending, "{}", theme.theme_id);
        assert_eq!(theme.exploration_depth, 0, "{}", theme.theme_id);
        assert_eq!(theme.completion_ratio(), 0.0, "{}", theme.theme_id);
        assert!(theme.extracted_events.is_empty(), "{}", theme.theme_id);
    }
}

#[test]
fn shipped_catalog_dependencies_reference_known_themes() {
    let mut loader = ThemeLoader::new(shipped_catalog_path());
    let themes = loader.load().expect("shipped catalog loads");

    for theme in themes.values() {
        for dep in &theme.depends_on {
            assert!(
                themes.contains_key(dep),
                "{} depends on unknown theme {dep}",
                theme.theme_id
            );
        }
    }
}

#[test]
fn shipped_catalog_first_pick_is_life_chapters() {
    let mut loader = ThemeLoader::new(shipped_catalog_path());
    loader.load().expect("shipped catalog loads");

    // Priority 1, no dependencies: the interview opens with the chapters.
    let next = loader.next_priority_theme(None).expect("a theme is ready");
    assert_eq!(next.theme_id, "THEME_01_LIFE_CHAPTERS");
    assert_eq!(next.domain, Domain::LifeChapters);
}
