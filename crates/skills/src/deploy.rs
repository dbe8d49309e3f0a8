//! Materializing skills at target paths, and taking them away again.
//!
//! Copies are owned by the target and replaced wholesale on redeploy. Links
//! never overwrite anything, and link removal refuses to touch an entry that
//! is not a symbolic link so a user's real directory is never deleted.

use std::{fmt, path::Path, str::FromStr};

use {
    serde::{Deserialize, Serialize},
    tracing::debug,
};

use crate::error::{Error, IoResultExt, Result};

/// How a skill is materialized at its target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployStrategy {
    /// Independent recursive copy.
    #[default]
    Copy,
    /// Symbolic link back to the source.
    Link,
}

/// What a removal found at the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    /// Nothing was there; removal is idempotent.
    Absent,
}

impl DeployStrategy {
    pub fn deploy(self, source: &Path, target: &Path) -> Result<()> {
        match self {
            Self::Copy => deploy_copy(source, target),
            Self::Link => deploy_link(source, target),
        }
    }

    pub fn remove(self, target: &Path) -> Result<Removal> {
        match self {
            Self::Copy => remove_copy(target),
            Self::Link => remove_link(target),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Link => "link",
        }
    }
}

impl fmt::Display for DeployStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeployStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "copy" => Ok(Self::Copy),
            "link" | "symlink" => Ok(Self::Link),
            other => Err(Error::message(format!(
                "unknown deploy mode '{other}' (expected 'copy' or 'link')"
            ))),
        }
    }
}

/// Replace whatever is at `target` with a recursive copy of `source`.
pub fn deploy_copy(source: &Path, target: &Path) -> Result<()> {
    ensure_parent(target)?;
    reject_nested_target(source, target)?;

    remove_copy(target)?;
    if source.is_dir() {
        copy_dir_recursive(source, target)?;
    } else {
        std::fs::copy(source, target).at(target)?;
    }
    debug!(source = %source.display(), target = %target.display(), "copied skill");
    Ok(())
}

/// Create a symbolic link at `target` pointing to `source`.
///
/// Fails with [`Error::AlreadyExists`] if anything, including a dangling
/// link, already occupies `target`.
pub fn deploy_link(source: &Path, target: &Path) -> Result<()> {
    ensure_parent(target)?;

    if std::fs::symlink_metadata(target).is_ok() {
        return Err(Error::AlreadyExists {
            path: target.to_path_buf(),
        });
    }
    symlink(source, target).at(target)?;
    debug!(source = %source.display(), target = %target.display(), "linked skill");
    Ok(())
}

/// Remove the file, directory tree or link at `target`, if any.
///
/// A link is removed itself; its destination is left alone.
pub fn remove_copy(target: &Path) -> Result<Removal> {
    let meta = match std::fs::symlink_metadata(target) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Removal::Absent),
        Err(e) => return Err(Error::io(target, e)),
    };

    if meta.is_dir() {
        std::fs::remove_dir_all(target).at(target)?;
    } else {
        remove_link_entry(target, &meta).at(target)?;
    }
    debug!(target = %target.display(), "removed deployed copy");
    Ok(Removal::Removed)
}

/// Unlink `target` if it is a symbolic link.
///
/// Anything else at `target` yields [`Error::UnsafeRemoval`] and is left
/// untouched.
pub fn remove_link(target: &Path) -> Result<Removal> {
    let meta = match std::fs::symlink_metadata(target) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Removal::Absent),
        Err(e) => return Err(Error::io(target, e)),
    };

    if !meta.file_type().is_symlink() {
        return Err(Error::UnsafeRemoval {
            path: target.to_path_buf(),
        });
    }
    remove_link_entry(target, &meta).at(target)?;
    debug!(target = %target.display(), "removed link");
    Ok(Removal::Removed)
}

fn ensure_parent(target: &Path) -> Result<()> {
    if let Some(parent) = target.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).at(parent)?;
    }
    Ok(())
}

/// Copying a source into itself would recurse forever.
fn reject_nested_target(source: &Path, target: &Path) -> Result<()> {
    let source = std::fs::canonicalize(source).at(source)?;
    let target_parent = target
        .parent()
        .map(std::fs::canonicalize)
        .transpose()
        .ok()
        .flatten();
    let nested = match (target_parent, target.file_name()) {
        (Some(parent), Some(name)) => parent.join(name).starts_with(&source),
        _ => false,
    };
    if nested {
        return Err(Error::message(format!(
            "cannot copy {} into itself at {}",
            source.display(),
            target.display()
        )));
    }
    Ok(())
}

fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest).at(dest)?;

    for entry in walkdir::WalkDir::new(src).min_depth(1) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| Error::message(format!("{}: {e}", entry.path().display())))?;
        let target = dest.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            std::fs::create_dir_all(&target).at(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target).at(&target)?;
        }
    }

    Ok(())
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> Result<()> {
    let dest = std::fs::read_link(link).at(link)?;
    std::os::unix::fs::symlink(dest, target).at(target)
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, target: &Path) -> Result<()> {
    // Without reliable symlink privileges, materialize what the link points to.
    if link.is_dir() {
        copy_dir_recursive(link, target)
    } else {
        std::fs::copy(link, target).at(target).map(|_| ())
    }
}

#[cfg(unix)]
fn symlink(source: &Path, target: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(source, target)
}

#[cfg(windows)]
fn symlink(source: &Path, target: &Path) -> std::io::Result<()> {
    if source.is_dir() {
        std::os::windows::fs::symlink_dir(source, target)
    } else {
        std::os::windows::fs::symlink_file(source, target)
    }
}

#[cfg(unix)]
fn remove_link_entry(target: &Path, _meta: &std::fs::Metadata) -> std::io::Result<()> {
    std::fs::remove_file(target)
}

// Directory symlinks on Windows are removed with `remove_dir`.
#[cfg(windows)]
fn remove_link_entry(target: &Path, meta: &std::fs::Metadata) -> std::io::Result<()> {
    use std::os::windows::fs::FileTypeExt;

    if meta.file_type().is_symlink_dir() {
        std::fs::remove_dir(target)
    } else {
        std::fs::remove_file(target)
    }
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, std::path::PathBuf};

    fn make_skill(root: &Path) -> PathBuf {
        let skill = root.join("src/skills/one");
        std::fs::create_dir_all(skill.join("docs")).unwrap();
        std::fs::write(skill.join("SKILL.md"), "# one\n").unwrap();
        std::fs::write(skill.join("docs/usage.md"), "usage\n").unwrap();
        skill
    }

    fn snapshot(dir: &Path) -> Vec<(PathBuf, Vec<u8>)> {
        let mut files: Vec<_> = walkdir::WalkDir::new(dir)
            .into_iter()
            .map(|e| e.unwrap())
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                (
                    e.path().strip_prefix(dir).unwrap().to_path_buf(),
                    std::fs::read(e.path()).unwrap(),
                )
            })
            .collect();
        files.sort();
        files
    }

    #[test]
    fn copy_creates_parent_and_copies_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let skill = make_skill(tmp.path());
        let target = tmp.path().join("dest/nested/one");

        deploy_copy(&skill, &target).unwrap();

        assert_eq!(snapshot(&skill), snapshot(&target));
        assert!(!std::fs::symlink_metadata(&target).unwrap().file_type().is_symlink());
    }

    #[test]
    fn copy_is_idempotent_and_drops_stale_files() {
        let tmp = tempfile::tempdir().unwrap();
        let skill = make_skill(tmp.path());
        let target = tmp.path().join("dest/one");

        deploy_copy(&skill, &target).unwrap();
        let once = snapshot(&target);
        std::fs::write(target.join("stale.txt"), "left over").unwrap();
        deploy_copy(&skill, &target).unwrap();

        assert_eq!(snapshot(&target), once);
    }

    #[test]
    fn copy_over_a_link_replaces_the_link_not_its_destination() {
        let tmp = tempfile::tempdir().unwrap();
        let skill = make_skill(tmp.path());
        let other = tmp.path().join("other");
        std::fs::create_dir_all(&other).unwrap();
        std::fs::write(other.join("keep.md"), "keep").unwrap();
        let target = tmp.path().join("dest/one");
        deploy_link(&other, &target).unwrap();

        deploy_copy(&skill, &target).unwrap();

        assert!(other.join("keep.md").exists());
        assert_eq!(snapshot(&skill), snapshot(&target));
    }

    #[test]
    fn copy_into_own_tree_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let skill = make_skill(tmp.path());
        let err = deploy_copy(&skill, &skill.join("docs/again")).unwrap_err();
        assert!(err.to_string().contains("into itself"));
    }

    #[test]
    fn copy_preserves_inner_symlinks() {
        let tmp = tempfile::tempdir().unwrap();
        let skill = make_skill(tmp.path());
        std::os::unix::fs::symlink("SKILL.md", skill.join("README.md")).unwrap();
        let target = tmp.path().join("dest/one");

        deploy_copy(&skill, &target).unwrap();

        let link = target.join("README.md");
        assert!(std::fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read_link(&link).unwrap(), PathBuf::from("SKILL.md"));
    }

    #[test]
    fn link_points_at_source() {
        let tmp = tempfile::tempdir().unwrap();
        let skill = make_skill(tmp.path());
        let target = tmp.path().join("dest/one");

        deploy_link(&skill, &target).unwrap();

        assert_eq!(std::fs::read_link(&target).unwrap(), skill);
        assert!(target.join("SKILL.md").is_file());
    }

    #[test]
    fn link_refuses_occupied_target() {
        let tmp = tempfile::tempdir().unwrap();
        let skill = make_skill(tmp.path());
        let target = tmp.path().join("dest/one");
        std::fs::create_dir_all(&target).unwrap();

        let err = deploy_link(&skill, &target).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { ref path } if path == &target));
    }

    #[test]
    fn link_refuses_dangling_link() {
        let tmp = tempfile::tempdir().unwrap();
        let skill = make_skill(tmp.path());
        let target = tmp.path().join("dangling");
        std::os::unix::fs::symlink(tmp.path().join("gone"), &target).unwrap();

        assert!(matches!(
            deploy_link(&skill, &target),
            Err(Error::AlreadyExists { .. })
        ));
    }

    #[test]
    fn remove_copy_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let skill = make_skill(tmp.path());
        let target = tmp.path().join("dest/one");
        deploy_copy(&skill, &target).unwrap();

        assert_eq!(remove_copy(&target).unwrap(), Removal::Removed);
        assert!(!target.exists());
        assert_eq!(remove_copy(&target).unwrap(), Removal::Absent);
    }

    #[test]
    fn remove_link_unlinks_without_touching_source() {
        let tmp = tempfile::tempdir().unwrap();
        let skill = make_skill(tmp.path());
        let target = tmp.path().join("dest/one");
        deploy_link(&skill, &target).unwrap();

        assert_eq!(remove_link(&target).unwrap(), Removal::Removed);
        assert!(std::fs::symlink_metadata(&target).is_err());
        assert!(skill.join("SKILL.md").is_file());
    }

    #[test]
    fn remove_link_on_missing_path_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(
            remove_link(&tmp.path().join("never-existed")).unwrap(),
            Removal::Absent
        );
    }

    #[test]
    fn remove_link_refuses_real_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let real = tmp.path().join("dest/one");
        std::fs::create_dir_all(&real).unwrap();
        std::fs::write(real.join("mine.md"), "user content").unwrap();

        let err = remove_link(&real).unwrap_err();
        assert!(matches!(err, Error::UnsafeRemoval { ref path } if path == &real));
        assert!(real.join("mine.md").is_file());
    }

    #[test]
    fn strategy_parses_and_dispatches() {
        assert_eq!("Copy".parse::<DeployStrategy>().unwrap(), DeployStrategy::Copy);
        assert_eq!("symlink".parse::<DeployStrategy>().unwrap(), DeployStrategy::Link);
        assert!("hardlink".parse::<DeployStrategy>().is_err());

        let tmp = tempfile::tempdir().unwrap();
        let skill = make_skill(tmp.path());
        let target = tmp.path().join("dest/one");
        DeployStrategy::Link.deploy(&skill, &target).unwrap();
        assert_eq!(DeployStrategy::Link.remove(&target).unwrap(), Removal::Removed);
    }
}
