use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

use crate::deploy::DeployStrategy;

/// Origin value marking a locally authored source.
pub const LOCAL_ORIGIN: &str = "local";

// ── Registry document ────────────────────────────────────────────────────────

/// The persisted registry: root directory of acquired sources plus one entry
/// per registered source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryDocument {
    pub skills_root: PathBuf,
    #[serde(default)]
    pub skills: BTreeMap<String, SourceEntry>,
}

impl RegistryDocument {
    pub fn empty(skills_root: PathBuf) -> Self {
        Self {
            skills_root,
            skills: BTreeMap::new(),
        }
    }
}

/// Where a source came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Origin {
    /// Authored in place with `skm create`.
    Local,
    /// A locator such as a git remote URL.
    Remote(String),
}

impl Origin {
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local)
    }
}

impl From<String> for Origin {
    fn from(value: String) -> Self {
        if value == LOCAL_ORIGIN {
            Self::Local
        } else {
            Self::Remote(value)
        }
    }
}

impl From<Origin> for String {
    fn from(origin: Origin) -> Self {
        match origin {
            Origin::Local => LOCAL_ORIGIN.to_string(),
            Origin::Remote(locator) => locator,
        }
    }
}

impl FromStr for Origin {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_string()))
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str(LOCAL_ORIGIN),
            Self::Remote(locator) => f.write_str(locator),
        }
    }
}

/// A registered source and the instances deployed from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    #[serde(rename = "source")]
    pub origin: Origin,
    #[serde(rename = "installDate")]
    pub registered_at: DateTime<Utc>,
    #[serde(rename = "links", default)]
    pub instances: Vec<DeployedInstance>,
}

impl SourceEntry {
    pub fn new(origin: Origin) -> Self {
        Self {
            origin,
            registered_at: Utc::now(),
            instances: Vec::new(),
        }
    }

    pub fn find_instance(&self, target_path: &Path) -> Option<&DeployedInstance> {
        self.instances.iter().find(|i| i.target_path == target_path)
    }

    /// Record an instance, replacing one with the same target path in place.
    ///
    /// Returns `true` when an existing entry was replaced.
    pub fn upsert_instance(&mut self, instance: DeployedInstance) -> bool {
        match self
            .instances
            .iter_mut()
            .find(|i| i.target_path == instance.target_path)
        {
            Some(existing) => {
                *existing = instance;
                true
            },
            None => {
                self.instances.push(instance);
                false
            },
        }
    }

    /// Drop the instance at `target_path`. Returns whether one was removed.
    pub fn remove_instance(&mut self, target_path: &Path) -> bool {
        let before = self.instances.len();
        self.instances.retain(|i| i.target_path != target_path);
        self.instances.len() != before
    }
}

/// One deployed copy or link of a skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployedInstance {
    pub target_path: PathBuf,
    /// Path inside the source; empty for whole-source deployments.
    #[serde(default)]
    pub source_sub_path: String,
    /// Registry files written before links were supported only hold copies.
    #[serde(default)]
    pub mode: DeployStrategy,
}

// ── Discovery ───────────────────────────────────────────────────────────────

/// A deployable directory found inside a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub display_name: String,
    /// Relative to the source root, `/`-separated. Empty means whole source.
    pub sub_path: String,
    /// Taken from the candidate's `SKILL.md`, when there is one.
    pub description: Option<String>,
}

impl Candidate {
    pub fn is_whole_source(&self) -> bool {
        self.sub_path.is_empty()
    }
}
