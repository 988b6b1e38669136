use serde::{Deserialize, Serialize};

/// Lifecycle state of a theme node.
///
/// Transitions are one-directional: Pending -> Mentioned -> Exhausted.
/// Exhausted is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    #[default]
    Pending,
    Mentioned,
    Exhausted,
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Mentioned => write!(f, "mentioned"),
            Self::Exhausted => write!(f, "exhausted"),
        }
    }
}

impl std::str::FromStr for NodeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "mentioned" => Ok(Self::Mentioned),
            "exhausted" => Ok(Self::Exhausted),
            _ => Err(format!("Unknown node status: {s}")),
        }
    }
}

/// The six McAdams life-story interview domains partitioning all themes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    LifeChapters,
    KeyScenes,
    FutureScripts,
    Challenges,
    PersonalIdeology,
    ContextManagement,
}

impl Domain {
    pub const ALL: [Domain; 6] = [
        Domain::LifeChapters,
        Domain::KeyScenes,
        Domain::FutureScripts,
        Domain::Challenges,
        Domain::PersonalIdeology,
        Domain::ContextManagement,
    ];
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LifeChapters => write!(f, "life_chapters"),
            Self::KeyScenes => write!(f, "key_scenes"),
            Self::FutureScripts => write!(f, "future_scripts"),
            Self::Challenges => write!(f, "challenges"),
            Self::PersonalIdeology => write!(f, "personal_ideology"),
            Self::ContextManagement => write!(f, "context_management"),
        }
    }
}

impl std::str::FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "life_chapters" => Ok(Self::LifeChapters),
            "key_scenes" => Ok(Self::KeyScenes),
            "future_scripts" => Ok(Self::FutureScripts),
            "challenges" => Ok(Self::Challenges),
            "personal_ideology" => Ok(Self::PersonalIdeology),
            "context_management" => Ok(Self::ContextManagement),
            _ => Err(format!("Unknown domain: {s}")),
        }
    }
}

/// Presentation tag for graph visualization, derived from status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStyle {
    DashedPending,
    DashedMentioned,
    SolidExhausted,
}

impl From<NodeStatus> for NodeStyle {
    fn from(status: NodeStatus) -> Self {
        match status {
            NodeStatus::Pending => Self::DashedPending,
            NodeStatus::Mentioned => Self::DashedMentioned,
            NodeStatus::Exhausted => Self::SolidExhausted,
        }
    }
}

/// How a theme reached Exhausted: through natural completion of its
/// exploration, or forced by an external decision such as a session timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    Natural,
    Forced,
}
