use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{dirs::config_dir, env_subst::substitute_env, schema::SkmConfig};

/// Standard settings file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["skm.toml", "skm.yaml", "skm.yml", "skm.json"];

/// Load settings from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<SkmConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load settings from standard locations.
///
/// Search order:
/// 1. `./skm.{toml,yaml,yml,json}` (project-local)
/// 2. `<config dir>/skm.{toml,yaml,yml,json}` (user-global)
///
/// Returns `SkmConfig::default()` if no file is found or it fails to load.
pub fn discover_and_load() -> SkmConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading settings");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load settings, using defaults");
            },
        }
    } else {
        debug!("no settings file found, using defaults");
    }
    SkmConfig::default()
}

fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES.iter().map(PathBuf::from);
    let global = config_dir()
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)));
    local.chain(global).find(|p| p.is_file())
}

/// Returns the path of an existing settings file, or the default TOML path.
pub fn find_or_default_config_path() -> PathBuf {
    if let Some(path) = find_config_file() {
        return path;
    }
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skm.toml")
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<SkmConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported settings format: .{ext}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn loads_each_supported_format() {
        let tmp = tempfile::tempdir().unwrap();

        let toml_path = tmp.path().join("skm.toml");
        std::fs::write(&toml_path, "[deploy]\ndefault_mode = \"link\"\n").unwrap();
        let cfg = load_config(&toml_path).unwrap();
        assert_eq!(cfg.deploy.default_mode.as_deref(), Some("link"));

        let yaml_path = tmp.path().join("skm.yaml");
        std::fs::write(&yaml_path, "deploy:\n  default_tool: cursor\n").unwrap();
        let cfg = load_config(&yaml_path).unwrap();
        assert_eq!(cfg.deploy.default_tool.as_deref(), Some("cursor"));

        let json_path = tmp.path().join("skm.json");
        std::fs::write(&json_path, r#"{"deploy":{"default_scope":"project"}}"#).unwrap();
        let cfg = load_config(&json_path).unwrap();
        assert_eq!(cfg.deploy.default_scope.as_deref(), Some("project"));
    }

    #[test]
    fn rejects_unknown_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("skm.ini");
        std::fs::write(&path, "").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn custom_targets_load_and_keep_unset_placeholders() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("skm.toml");
        std::fs::write(
            &path,
            "[targets.zed]\npath = \"${SKM_TEST_UNSET_ROOT}/zed/skills\"\ndescription = \"Zed editor\"\n",
        )
        .unwrap();

        let loaded = load_config(&path).unwrap();
        let zed = loaded.custom_target("ZED").unwrap();
        assert_eq!(zed.path, PathBuf::from("${SKM_TEST_UNSET_ROOT}/zed/skills"));
        assert_eq!(zed.description.as_deref(), Some("Zed editor"));
    }
}
