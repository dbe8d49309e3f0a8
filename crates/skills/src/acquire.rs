//! Bringing remote sources into the skills root and refreshing them.

use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    process::Stdio,
};

use {
    async_trait::async_trait,
    tokio::process::Command,
    tracing::{debug, info, warn},
};

use crate::{
    deploy,
    error::{Error, IoResultExt, Result},
    lifecycle::{ResyncOutcome, SkillManager, check_name},
    registry::RegistryStore,
    types::Origin,
};

const VCS_DIR: &str = ".git";

/// Fetches a source by locator into a directory and refreshes it later.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Populate `dest`, which must not exist yet.
    async fn fetch(&self, locator: &str, dest: &Path) -> Result<()>;

    /// Bring an already fetched directory up to date.
    async fn refresh(&self, dir: &Path) -> Result<()>;
}

/// Shells out to the `git` executable.
#[derive(Debug, Clone)]
pub struct GitFetcher {
    program: PathBuf,
}

impl GitFetcher {
    /// Locate `git` on `PATH`.
    pub fn detect() -> Result<Self> {
        let program = which::which("git")
            .map_err(|_| Error::message("git is not installed or not on PATH"))?;
        Ok(Self { program })
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Run git with the terminal attached so its progress stays visible.
    async fn run(&self, operation: &'static str, cwd: Option<&Path>, args: &[&OsStr]) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        let status = cmd
            .status()
            .await
            .map_err(|e| Error::command_execution(operation, e))?;
        if !status.success() {
            return Err(Error::command_failed(operation, format!("exited with {status}")));
        }
        Ok(())
    }
}

#[async_trait]
impl SourceFetcher for GitFetcher {
    async fn fetch(&self, locator: &str, dest: &Path) -> Result<()> {
        debug!(locator, dest = %dest.display(), "cloning");
        let args = [
            OsStr::new("clone"),
            OsStr::new("--"),
            OsStr::new(locator),
            dest.as_os_str(),
        ];
        self.run("git clone", None, &args).await
    }

    async fn refresh(&self, dir: &Path) -> Result<()> {
        debug!(dir = %dir.display(), "pulling");
        let args = [OsStr::new("pull"), OsStr::new("--ff-only")];
        self.run("git pull", Some(dir), &args).await
    }
}

/// Default source name for a locator: its last path segment without `.git`.
///
/// Handles `https://host/owner/repo(.git)`, `git@host:owner/repo.git` and
/// plain local paths.
pub fn repo_name(locator: &str) -> Result<String> {
    let trimmed = locator.trim().trim_end_matches(['/', '\\']);
    let last = trimmed
        .rsplit(['/', '\\', ':'])
        .next()
        .unwrap_or(trimmed);
    let name = last.strip_suffix(".git").unwrap_or(last);
    check_name(name).map_err(|_| {
        Error::message(format!("cannot derive a source name from '{locator}'"))
    })?;
    Ok(name.to_string())
}

/// Whether a source can be refreshed from its origin.
pub fn is_refreshable<S: RegistryStore>(manager: &SkillManager<S>, name: &str) -> bool {
    !manager.is_local(name) && manager.source_path(name).join(VCS_DIR).exists()
}

/// Fetch `locator` into the skills root and register it.
///
/// Returns the registered name. Nothing is registered when the fetch fails,
/// and a fetched directory that cannot be registered is removed again.
pub async fn acquire_source<S: RegistryStore>(
    manager: &mut SkillManager<S>,
    fetcher: &dyn SourceFetcher,
    locator: &str,
    name: Option<&str>,
) -> Result<String> {
    let name = match name {
        Some(n) => {
            check_name(n)?;
            n.to_string()
        },
        None => repo_name(locator)?,
    };
    if manager.store().get(&name).is_some() {
        return Err(Error::SourceExists { name });
    }
    let dest = manager.source_path(&name);
    if dest.exists() {
        return Err(Error::AlreadyExists { path: dest });
    }

    let root = manager.skills_root().to_path_buf();
    std::fs::create_dir_all(&root).at(&root)?;
    fetcher.fetch(locator, &dest).await?;

    if let Err(e) = manager.register_source(&name, Origin::Remote(locator.to_string())) {
        manager.forget_source(&name);
        if let Err(cleanup) = deploy::remove_copy(&dest) {
            warn!(path = %dest.display(), error = %cleanup, "failed to remove unregistered clone");
        }
        return Err(e);
    }
    info!(source = %name, locator, "acquired source");
    Ok(name)
}

#[derive(Debug)]
pub struct RefreshReport {
    /// False when the source is local or not a git checkout.
    pub refreshed: bool,
    pub resynced: Vec<ResyncOutcome>,
}

/// Refresh a source from its origin, then re-copy its copy-mode instances.
pub async fn refresh_source<S: RegistryStore>(
    manager: &SkillManager<S>,
    fetcher: &dyn SourceFetcher,
    name: &str,
) -> Result<RefreshReport> {
    manager.get_source(name)?;
    let refreshed = is_refreshable(manager, name);
    if refreshed {
        fetcher.refresh(&manager.source_path(name)).await?;
    } else {
        debug!(source = name, "source is not refreshable, resyncing only");
    }
    let resynced = manager.resync_copies(name)?;
    Ok(RefreshReport {
        refreshed,
        resynced,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        crate::{
            deploy::DeployStrategy,
            lifecycle::DeployRequest,
            registry::{InMemoryRegistryStore, JsonRegistryStore},
        },
        rstest::rstest,
        std::sync::Mutex,
    };

    /// Writes a fixed layout instead of talking to a remote.
    #[derive(Default)]
    struct FakeFetcher {
        fail: bool,
        refreshed: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl SourceFetcher for FakeFetcher {
        async fn fetch(&self, _locator: &str, dest: &Path) -> Result<()> {
            if self.fail {
                return Err(Error::command_failed("git clone", "repository not found"));
            }
            std::fs::create_dir_all(dest.join(".git")).unwrap();
            std::fs::create_dir_all(dest.join("skills/one")).unwrap();
            std::fs::write(dest.join("skills/one/SKILL.md"), "# one\n").unwrap();
            Ok(())
        }

        async fn refresh(&self, dir: &Path) -> Result<()> {
            self.refreshed.lock().unwrap().push(dir.to_path_buf());
            std::fs::write(dir.join("skills/one/SKILL.md"), "# one v2\n").unwrap();
            Ok(())
        }
    }

    #[rstest]
    #[case("https://github.com/acme/agent-skills.git", "agent-skills")]
    #[case("https://github.com/acme/agent-skills", "agent-skills")]
    #[case("https://github.com/acme/agent-skills/", "agent-skills")]
    #[case("git@github.com:acme/agent-skills.git", "agent-skills")]
    #[case("/srv/mirrors/team-skills", "team-skills")]
    fn derives_repo_names(#[case] locator: &str, #[case] expected: &str) {
        assert_eq!(repo_name(locator).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("https://github.com/acme/..")]
    #[case(".git")]
    fn rejects_underivable_names(#[case] locator: &str) {
        assert!(repo_name(locator).is_err());
    }

    #[tokio::test]
    async fn acquire_registers_remote_source() {
        let tmp = tempfile::tempdir().unwrap();
        let mut manager = SkillManager::new(InMemoryRegistryStore::new(tmp.path().join("skills")));

        let name = acquire_source(
            &mut manager,
            &FakeFetcher::default(),
            "https://github.com/acme/alpha.git",
            None,
        )
        .await
        .unwrap();

        assert_eq!(name, "alpha");
        let entry = manager.get_source("alpha").unwrap();
        assert_eq!(
            entry.origin,
            Origin::Remote("https://github.com/acme/alpha.git".into())
        );
        assert!(manager.source_path("alpha").join("skills/one").is_dir());
        assert!(is_refreshable(&manager, "alpha"));
    }

    #[tokio::test]
    async fn acquire_refuses_existing_destination() {
        let tmp = tempfile::tempdir().unwrap();
        let mut manager = SkillManager::new(InMemoryRegistryStore::new(tmp.path().join("skills")));
        std::fs::create_dir_all(manager.source_path("alpha")).unwrap();

        let err = acquire_source(&mut manager, &FakeFetcher::default(), "https://x/alpha", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }));
        assert!(manager.list_sources().is_empty());
    }

    #[tokio::test]
    async fn failed_fetch_registers_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let mut manager = SkillManager::new(InMemoryRegistryStore::new(tmp.path().join("skills")));
        let fetcher = FakeFetcher {
            fail: true,
            ..Default::default()
        };

        let err = acquire_source(&mut manager, &fetcher, "https://x/alpha", Some("renamed"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CommandFailed { .. }));
        assert!(manager.list_sources().is_empty());
    }

    #[tokio::test]
    async fn unregistrable_clone_is_removed() {
        let tmp = tempfile::tempdir().unwrap();
        let state = tmp.path().join("state");
        let store =
            JsonRegistryStore::open(state.join("config.json"), tmp.path().join("skills")).unwrap();
        let mut manager = SkillManager::new(store);
        std::fs::remove_dir_all(&state).unwrap();
        std::fs::write(&state, "blocker").unwrap();

        let err = acquire_source(&mut manager, &FakeFetcher::default(), "https://x/alpha.git", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PersistenceFailure { .. }));
        assert!(!manager.source_path("alpha").exists());
        assert!(manager.list_sources().is_empty());
    }

    #[tokio::test]
    async fn missing_git_binary_is_an_execution_error() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = GitFetcher::with_program(tmp.path().join("no-such-git"));
        let err = fetcher
            .fetch("https://x/alpha.git", &tmp.path().join("alpha"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CommandExecution { operation: "git clone", .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_git_exit_reports_the_status() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = GitFetcher::with_program("false");
        let err = fetcher.refresh(tmp.path()).await.unwrap_err();
        match err {
            Error::CommandFailed { operation, detail } => {
                assert_eq!(operation, "git pull");
                assert!(detail.starts_with("exited with"), "{detail}");
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn refresh_pulls_and_resyncs_copies() {
        let tmp = tempfile::tempdir().unwrap();
        let mut manager = SkillManager::new(InMemoryRegistryStore::new(tmp.path().join("skills")));
        let fetcher = FakeFetcher::default();
        acquire_source(&mut manager, &fetcher, "https://x/alpha.git", None)
            .await
            .unwrap();
        let dest = tmp.path().join("dest");
        let candidates = manager.discover_candidates("alpha").unwrap();
        manager
            .deploy(DeployRequest {
                source: "alpha".into(),
                candidates,
                target_parent: dest.clone(),
                strategy: DeployStrategy::Copy,
                create_target_root: true,
            })
            .unwrap();

        let report = refresh_source(&manager, &fetcher, "alpha").await.unwrap();
        assert!(report.refreshed);
        assert_eq!(fetcher.refreshed.lock().unwrap().len(), 1);
        assert_eq!(report.resynced.len(), 1);
        assert_eq!(
            std::fs::read_to_string(dest.join("one/SKILL.md")).unwrap(),
            "# one v2\n"
        );
    }

    #[tokio::test]
    async fn local_sources_are_not_pulled() {
        let tmp = tempfile::tempdir().unwrap();
        let mut manager = SkillManager::new(InMemoryRegistryStore::new(tmp.path().join("skills")));
        std::fs::create_dir_all(manager.source_path("mine").join(".git")).unwrap();
        manager.register_source("mine", Origin::Local).unwrap();
        let fetcher = FakeFetcher::default();

        let report = refresh_source(&manager, &fetcher, "mine").await.unwrap();
        assert!(!report.refreshed);
        assert!(fetcher.refreshed.lock().unwrap().is_empty());
    }
}
