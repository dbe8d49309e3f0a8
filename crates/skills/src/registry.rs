use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::{
    error::{Error, IoResultExt, Result},
    lifecycle::check_name,
    types::{RegistryDocument, SourceEntry},
};

/// Persistent catalog of registered sources.
///
/// Mutations persist before returning. When persisting fails the in-memory
/// state keeps the change and the caller gets a
/// [`Error::PersistenceFailure`] to report; it does not need to abort.
pub trait RegistryStore {
    fn document(&self) -> &RegistryDocument;

    fn upsert(&mut self, name: &str, entry: SourceEntry) -> Result<()>;

    fn remove(&mut self, name: &str) -> Result<()>;

    /// Directory holding acquired sources, one subdirectory per name.
    fn skills_root(&self) -> &Path {
        &self.document().skills_root
    }

    fn get(&self, name: &str) -> Option<&SourceEntry> {
        self.document().skills.get(name)
    }

    fn list(&self) -> &BTreeMap<String, SourceEntry> {
        &self.document().skills
    }
}

// ── JSON file-backed implementation ──────────────────────────────────

/// Registry stored as a single JSON document.
pub struct JsonRegistryStore {
    path: PathBuf,
    doc: RegistryDocument,
    load_warning: Option<String>,
}

impl JsonRegistryStore {
    /// Default registry path: `~/.skills-manager/config.json`.
    pub fn default_path() -> PathBuf {
        skm_config::data_dir().join("config.json")
    }

    /// Default root for acquired sources: `~/.skills-manager/skills`.
    pub fn default_skills_root() -> PathBuf {
        skm_config::data_dir().join("skills")
    }

    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path(), Self::default_skills_root())
    }

    /// Open the registry at `path`.
    ///
    /// A missing file is initialized empty and written immediately; failing
    /// to write it is an error. An unreadable file is replaced in memory by
    /// an empty registry and the problem is kept in [`Self::load_warning`].
    pub fn open(path: PathBuf, default_skills_root: PathBuf) -> Result<Self> {
        if !path.exists() {
            let store = Self {
                doc: RegistryDocument::empty(default_skills_root),
                path,
                load_warning: None,
            };
            store.save()?;
            debug!(path = %store.path.display(), "initialized empty registry");
            return Ok(store);
        }

        let (doc, load_warning) = match read_document(&path) {
            Ok(doc) => (doc, None),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load registry, using an empty one");
                (
                    RegistryDocument::empty(default_skills_root),
                    Some(e.to_string()),
                )
            },
        };
        Ok(Self {
            path,
            doc,
            load_warning,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Why the persisted registry could not be read, if it could not.
    pub fn load_warning(&self) -> Option<&str> {
        self.load_warning.as_deref()
    }

    /// Save atomically via temp file + rename.
    fn save(&self) -> Result<()> {
        write_document(&self.path, &self.doc).map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "failed to persist registry");
            Error::persistence(&self.path, e)
        })
    }
}

impl RegistryStore for JsonRegistryStore {
    fn document(&self) -> &RegistryDocument {
        &self.doc
    }

    fn upsert(&mut self, name: &str, entry: SourceEntry) -> Result<()> {
        self.doc.skills.insert(name.to_string(), entry);
        self.save()
    }

    fn remove(&mut self, name: &str) -> Result<()> {
        self.doc.skills.remove(name);
        self.save()
    }
}

fn read_document(path: &Path) -> Result<RegistryDocument> {
    let data = std::fs::read_to_string(path).at(path)?;
    let mut doc: RegistryDocument = serde_json::from_str(&data)?;
    doc.skills.retain(|name, _| match check_name(name) {
        Ok(()) => true,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "dropping registry entry");
            false
        },
    });
    Ok(doc)
}

fn write_document(path: &Path, doc: &RegistryDocument) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).at(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_string_pretty(doc)?;
    std::fs::write(&tmp, data).at(&tmp)?;
    std::fs::rename(&tmp, path).at(path)?;
    Ok(())
}

// ── In-memory implementation ─────────────────────────────────────────

/// Registry that never touches disk.
#[derive(Debug, Clone)]
pub struct InMemoryRegistryStore {
    doc: RegistryDocument,
}

impl InMemoryRegistryStore {
    pub fn new(skills_root: PathBuf) -> Self {
        Self {
            doc: RegistryDocument::empty(skills_root),
        }
    }
}

impl RegistryStore for InMemoryRegistryStore {
    fn document(&self) -> &RegistryDocument {
        &self.doc
    }

    fn upsert(&mut self, name: &str, entry: SourceEntry) -> Result<()> {
        self.doc.skills.insert(name.to_string(), entry);
        Ok(())
    }

    fn remove(&mut self, name: &str) -> Result<()> {
        self.doc.skills.remove(name);
        Ok(())
    }
}
