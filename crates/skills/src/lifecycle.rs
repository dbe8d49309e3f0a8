//! Deploy/remove orchestration on top of a [`RegistryStore`].
//!
//! A deploy request runs discovery checks, target resolution, per-candidate
//! deployment and registry recording in that order. Candidates are handled
//! one at a time; a failing candidate is reported and the rest proceed.
//! Removing a whole source always ends with the source unregistered, even
//! when some of its instances could not be removed.

use std::{
    collections::BTreeMap,
    path::{Component, Path, PathBuf},
};

use tracing::{debug, info, warn};

use crate::{
    deploy::{self, DeployStrategy, Removal},
    discover,
    error::{Error, IoResultExt, Result},
    registry::RegistryStore,
    types::{Candidate, DeployedInstance, Origin, SourceEntry},
};

/// A request to materialize selected candidates of one source.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub source: String,
    pub candidates: Vec<Candidate>,
    pub target_parent: PathBuf,
    pub strategy: DeployStrategy,
    /// The caller confirmed creating `target_parent` if it is missing.
    pub create_target_root: bool,
}

/// Result of deploying one candidate.
#[derive(Debug)]
pub struct DeployOutcome {
    pub candidate: Candidate,
    pub target_path: PathBuf,
    pub result: Result<()>,
    /// Set when the deployment succeeded but recording it could not be saved.
    pub persist_error: Option<Error>,
}

#[derive(Debug, Default)]
pub struct DeployReport {
    pub created_target_root: bool,
    pub items: Vec<DeployOutcome>,
}

impl DeployReport {
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|i| i.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.succeeded()
    }
}

/// Result of removing one deployed instance.
#[derive(Debug)]
pub struct RemovalOutcome {
    pub target_path: PathBuf,
    pub mode: DeployStrategy,
    pub result: Result<Removal>,
    pub persist_error: Option<Error>,
}

#[derive(Debug)]
pub struct SourceRemovalReport {
    pub name: String,
    pub instances: Vec<RemovalOutcome>,
    pub source_dir: PathBuf,
    pub source_dir_result: Result<Removal>,
    /// Unregistration is always attempted; this only fails on persistence.
    pub unregister_result: Result<()>,
}

impl SourceRemovalReport {
    pub fn failures(&self) -> usize {
        self.instances.iter().filter(|i| i.result.is_err()).count()
            + usize::from(self.source_dir_result.is_err())
            + usize::from(self.unregister_result.is_err())
    }
}

/// Result of re-copying one copy-mode instance after a refresh.
#[derive(Debug)]
pub struct ResyncOutcome {
    pub target_path: PathBuf,
    pub result: Result<()>,
}

/// Owns the registry and coordinates every lifecycle operation.
pub struct SkillManager<S> {
    store: S,
}

impl<S: RegistryStore> SkillManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn skills_root(&self) -> &Path {
        self.store.skills_root()
    }

    /// Directory holding the source `name`.
    pub fn source_path(&self, name: &str) -> PathBuf {
        self.store.skills_root().join(name)
    }

    pub fn list_sources(&self) -> &BTreeMap<String, SourceEntry> {
        self.store.list()
    }

    /// Look up a registered source; names that are not a single path
    /// component are rejected before touching the registry.
    pub fn get_source(&self, name: &str) -> Result<&SourceEntry> {
        check_name(name)?;
        self.store
            .get(name)
            .ok_or_else(|| Error::not_found(format!("source '{name}'")))
    }

    pub fn is_local(&self, name: &str) -> bool {
        self.store.get(name).is_some_and(|e| e.origin.is_local())
    }

    /// Record a freshly acquired or authored source.
    pub fn register_source(&mut self, name: &str, origin: Origin) -> Result<SourceEntry> {
        check_name(name)?;
        if self.store.get(name).is_some() {
            return Err(Error::SourceExists {
                name: name.to_string(),
            });
        }
        let entry = SourceEntry::new(origin);
        self.store.upsert(name, entry.clone())?;
        info!(source = name, origin = %entry.origin, "registered source");
        Ok(entry)
    }

    /// Deployable candidates of a registered source.
    pub fn discover_candidates(&self, name: &str) -> Result<Vec<Candidate>> {
        self.get_source(name)?;
        discover::discover_candidates(name, &self.source_path(name))
    }

    /// Deploy the selected candidates and record every success.
    ///
    /// Structural problems (unknown or missing source, unconfirmed target
    /// root) fail the whole request. Per-candidate failures are collected in
    /// the report.
    pub fn deploy(&mut self, request: DeployRequest) -> Result<DeployReport> {
        let DeployRequest {
            source,
            candidates,
            target_parent,
            strategy,
            create_target_root,
        } = request;

        let mut entry = self.get_source(&source)?.clone();
        let source_root = self.existing_source_root(&source)?;

        if candidates.is_empty() {
            debug!(source = %source, "nothing selected");
            return Ok(DeployReport::default());
        }

        let target_parent = std::path::absolute(&target_parent).at(&target_parent)?;
        let mut report = DeployReport::default();
        if !target_parent.is_dir() {
            if !create_target_root {
                return Err(Error::TargetRootUnconfirmed {
                    path: target_parent,
                });
            }
            std::fs::create_dir_all(&target_parent).at(&target_parent)?;
            report.created_target_root = true;
            info!(path = %target_parent.display(), "created target directory");
        }

        for candidate in candidates {
            let target_path = target_parent.join(&candidate.display_name);
            let result = check_name(&candidate.display_name).and_then(|()| {
                let source_path = candidate_source(&source_root, &candidate.sub_path);
                strategy.deploy(&source_path, &target_path)
            });

            let mut persist_error = None;
            match &result {
                Ok(()) => {
                    info!(
                        source = %source,
                        skill = %candidate.display_name,
                        target = %target_path.display(),
                        mode = %strategy,
                        "deployed skill"
                    );
                    entry.upsert_instance(DeployedInstance {
                        target_path: target_path.clone(),
                        source_sub_path: candidate.sub_path.clone(),
                        mode: strategy,
                    });
                    if let Err(e) = self.store.upsert(&source, entry.clone()) {
                        persist_error = Some(e);
                    }
                },
                Err(e) => {
                    warn!(
                        source = %source,
                        target = %target_path.display(),
                        error = %e,
                        "failed to deploy skill"
                    );
                },
            }

            report.items.push(DeployOutcome {
                candidate,
                target_path,
                result,
                persist_error,
            });
        }

        Ok(report)
    }

    /// Remove one tracked instance using `strategy`.
    ///
    /// The instance stays recorded when the filesystem removal fails, so it
    /// can be retried.
    pub fn remove_instance(
        &mut self,
        source: &str,
        target_path: &Path,
        strategy: DeployStrategy,
    ) -> Result<RemovalOutcome> {
        let mut entry = self.get_source(source)?.clone();
        if entry.find_instance(target_path).is_none() {
            return Err(Error::not_found(format!(
                "instance {} of source '{source}'",
                target_path.display()
            )));
        }

        let result = strategy.remove(target_path);
        let mut persist_error = None;
        match &result {
            Ok(removal) => {
                debug!(target = %target_path.display(), ?removal, "removed instance");
                entry.remove_instance(target_path);
                if let Err(e) = self.store.upsert(source, entry) {
                    persist_error = Some(e);
                }
            },
            Err(e) => {
                warn!(target = %target_path.display(), error = %e, "failed to remove instance");
            },
        }

        Ok(RemovalOutcome {
            target_path: target_path.to_path_buf(),
            mode: strategy,
            result,
            persist_error,
        })
    }

    /// Remove several instances, each with the mode it was deployed with.
    pub fn remove_instances(
        &mut self,
        source: &str,
        targets: &[PathBuf],
    ) -> Result<Vec<RemovalOutcome>> {
        let entry = self.get_source(source)?.clone();
        let mut outcomes = Vec::with_capacity(targets.len());
        for target in targets {
            let outcome = match entry.find_instance(target).map(|i| i.mode) {
                Some(mode) => self.remove_instance(source, target, mode)?,
                None => {
                    warn!(source, target = %target.display(), "not a tracked instance");
                    RemovalOutcome {
                        target_path: target.clone(),
                        mode: DeployStrategy::default(),
                        result: Err(Error::not_found(format!(
                            "instance {} of source '{source}'",
                            target.display()
                        ))),
                        persist_error: None,
                    }
                },
            };
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Remove every instance, the source directory, and the registry entry.
    pub fn remove_source(&mut self, name: &str) -> Result<SourceRemovalReport> {
        let entry = self.get_source(name)?.clone();

        let instances = entry
            .instances
            .iter()
            .map(|instance| {
                let result = instance.mode.remove(&instance.target_path);
                if let Err(e) = &result {
                    warn!(
                        source = name,
                        target = %instance.target_path.display(),
                        error = %e,
                        "failed to remove instance"
                    );
                }
                RemovalOutcome {
                    target_path: instance.target_path.clone(),
                    mode: instance.mode,
                    result,
                    persist_error: None,
                }
            })
            .collect();

        let source_dir = self.source_path(name);
        let source_dir_result = deploy::remove_copy(&source_dir);
        if let Err(e) = &source_dir_result {
            warn!(source = name, path = %source_dir.display(), error = %e, "failed to remove source directory");
        }

        let unregister_result = self.store.remove(name);
        info!(source = name, "unregistered source");

        Ok(SourceRemovalReport {
            name: name.to_string(),
            instances,
            source_dir,
            source_dir_result,
            unregister_result,
        })
    }

    /// Re-copy every copy-mode instance of `name` from its source.
    ///
    /// Link instances already see the refreshed content and are skipped.
    pub fn resync_copies(&self, name: &str) -> Result<Vec<ResyncOutcome>> {
        let entry = self.get_source(name)?;
        let source_root = self.existing_source_root(name)?;

        let outcomes = entry
            .instances
            .iter()
            .filter(|i| i.mode == DeployStrategy::Copy)
            .map(|instance| {
                let source_path = candidate_source(&source_root, &instance.source_sub_path);
                let result = deploy::deploy_copy(&source_path, &instance.target_path);
                if let Err(e) = &result {
                    warn!(source = name, target = %instance.target_path.display(), error = %e, "failed to resync copy");
                }
                ResyncOutcome {
                    target_path: instance.target_path.clone(),
                    result,
                }
            })
            .collect();
        Ok(outcomes)
    }

    /// Absolute directory of `name`, which must exist. Links are built from
    /// this path, so a relative skills root must not leak into them.
    fn existing_source_root(&self, name: &str) -> Result<PathBuf> {
        let path = self.source_path(name);
        let path = std::path::absolute(&path).at(&path)?;
        if !path.is_dir() {
            return Err(Error::SourceMissing {
                name: name.to_string(),
                path,
            });
        }
        Ok(path)
    }

    /// Drop a registration without touching the filesystem.
    pub(crate) fn forget_source(&mut self, name: &str) {
        if let Err(e) = self.store.remove(name) {
            warn!(source = name, error = %e, "failed to forget source");
        }
    }
}

fn candidate_source(source_root: &Path, sub_path: &str) -> PathBuf {
    if sub_path.is_empty() {
        source_root.to_path_buf()
    } else {
        source_root.join(sub_path)
    }
}

/// Names become path components, so they must be exactly one.
pub(crate) fn check_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !name.contains(['/', '\\']) => Ok(()),
        _ => Err(Error::InvalidName {
            name: name.to_string(),
        }),
    }
}
