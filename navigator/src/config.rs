use serde::Deserialize;
use std::env;
use std::path::PathBuf;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

/// Which backing structure the graph store uses.
///
/// `Petgraph` keeps the graph in a `petgraph::StableDiGraph`; `Adjacency`
/// keeps a plain adjacency map. Callers never see the difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphBackend {
    Petgraph,
    Adjacency,
}

impl std::str::FromStr for GraphBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "petgraph" => Ok(Self::Petgraph),
            "adjacency" => Ok(Self::Adjacency),
            _ => Err(format!("Unknown graph backend: {s}")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub checkpoints: CheckpointConfig,
    pub graph: GraphConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Path to the theme catalog JSON file.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckpointConfig {
    /// Base directory for per-session checkpoint directories.
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    pub backend: GraphBackend,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            catalog: CatalogConfig {
                path: parse_env_or(
                    "NAVIGATOR_THEMES_PATH",
                    PathBuf::from("data/themes/mcadams_themes.json"),
                ),
            },
            checkpoints: CheckpointConfig {
                dir: parse_env_or("NAVIGATOR_CHECKPOINT_DIR", PathBuf::from("data/interviews")),
            },
            graph: GraphConfig {
                backend: parse_env_or("NAVIGATOR_GRAPH_BACKEND", GraphBackend::Petgraph),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
