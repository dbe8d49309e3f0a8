//! Authoring new skills in the local source.

use std::path::PathBuf;

use tracing::info;

use crate::{
    error::{Error, IoResultExt, Result},
    lifecycle::{SkillManager, check_name},
    parse::SKILL_FILE,
    registry::RegistryStore,
    types::Origin,
};

/// Source that holds skills authored on this machine.
pub const LOCAL_SOURCE: &str = "my-local-skills";

/// Reject names that are empty or would not stay a single directory.
pub fn validate_skill_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::message("skill name cannot be empty"));
    }
    check_name(name)
}

/// Contents of a freshly created `SKILL.md`.
pub fn skill_template(name: &str) -> String {
    format!("# {name}\n\nAdd your skill instructions, rules, or prompts here.\n")
}

/// Create `<local source>/<name>/SKILL.md`, registering the local source on
/// first use. Returns the new skill directory.
pub fn create_local_skill<S: RegistryStore>(
    manager: &mut SkillManager<S>,
    name: &str,
) -> Result<PathBuf> {
    validate_skill_name(name)?;

    let source_dir = manager.source_path(LOCAL_SOURCE);
    std::fs::create_dir_all(&source_dir).at(&source_dir)?;
    if manager.store().get(LOCAL_SOURCE).is_none() {
        manager.register_source(LOCAL_SOURCE, Origin::Local)?;
    }

    let skill_dir = source_dir.join(name);
    if skill_dir.exists() {
        return Err(Error::AlreadyExists { path: skill_dir });
    }
    std::fs::create_dir_all(&skill_dir).at(&skill_dir)?;
    let skill_md = skill_dir.join(SKILL_FILE);
    std::fs::write(&skill_md, skill_template(name)).at(&skill_md)?;

    info!(skill = name, path = %skill_dir.display(), "created local skill");
    Ok(skill_dir)
}
