use std::path::Path;

use crate::{
    error::{Error, IoResultExt, Result},
    parse,
    types::Candidate,
};

/// Conventional container for multi-skill sources.
pub const SKILLS_DIR: &str = "skills";

const VCS_DIR: &str = ".git";

/// Enumerate deployable sub-skills of the source `name` rooted at `source_path`.
///
/// Searches `<source>/skills/` when it exists, else the source root. Every
/// visible direct subdirectory is a candidate. A source with none yields a
/// single candidate standing for the whole source. Order follows the
/// directory listing.
pub fn discover_candidates(name: &str, source_path: &Path) -> Result<Vec<Candidate>> {
    if !source_path.is_dir() {
        return Err(Error::SourceMissing {
            name: name.to_string(),
            path: source_path.to_path_buf(),
        });
    }

    let skills_dir = source_path.join(SKILLS_DIR);
    let (search_dir, prefix) = if skills_dir.is_dir() {
        (skills_dir, format!("{SKILLS_DIR}/"))
    } else {
        (source_path.to_path_buf(), String::new())
    };

    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(&search_dir).at(&search_dir)? {
        let entry = entry.at(&search_dir)?;
        let Some(dir_name) = entry.file_name().to_str().map(str::to_owned) else {
            tracing::debug!(path = ?entry.path(), "skipping non UTF-8 directory name");
            continue;
        };
        if dir_name.starts_with('.') || dir_name == VCS_DIR {
            continue;
        }
        // Follows links: a linked directory is deployable too.
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        candidates.push(Candidate {
            description: parse::read_summary(&path).and_then(|s| s.description),
            sub_path: format!("{prefix}{dir_name}"),
            display_name: dir_name,
        });
    }

    if candidates.is_empty() {
        tracing::debug!(source = name, "no sub-skills found, offering the whole source");
        candidates.push(Candidate {
            display_name: name.to_string(),
            sub_path: String::new(),
            description: parse::read_summary(source_path).and_then(|s| s.description),
        });
    }

    Ok(candidates)
}
