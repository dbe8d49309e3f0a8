//! Settings schema for `skm.toml`.
use std::{collections::BTreeMap, path::PathBuf};

use serde::{Deserialize, Serialize};

/// Root settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkmConfig {
    /// Defaults applied to `skm link` when flags are omitted.
    pub deploy: DeployConfig,
    /// Extra named target directories, usable as `--tool <name>`.
    pub targets: BTreeMap<String, CustomTarget>,
}

impl SkmConfig {
    /// Look up a custom target by name (case-insensitive).
    pub fn custom_target(&self, name: &str) -> Option<&CustomTarget> {
        self.targets
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, target)| target)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// `copy` or `link`.
    pub default_mode: Option<String>,
    /// Tool identifier such as `claude` or `cursor`.
    pub default_tool: Option<String>,
    /// `global` or `project`.
    pub default_scope: Option<String>,
}

/// A user-defined deployment directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomTarget {
    pub path: PathBuf,
    /// Short label shown in prompts.
    #[serde(default)]
    pub description: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg: SkmConfig = toml::from_str("").unwrap();
        assert!(cfg.deploy.default_mode.is_none());
        assert!(cfg.targets.is_empty());
    }

    #[test]
    fn custom_target_lookup_ignores_case() {
        let cfg: SkmConfig = toml::from_str(
            r#"
[targets.Zed]
path = "/home/dev/.zed/skills"
"#,
        )
        .unwrap();
        let target = cfg.custom_target("zed").unwrap();
        assert_eq!(target.path, PathBuf::from("/home/dev/.zed/skills"));
        assert!(cfg.custom_target("helix").is_none());
    }
}
