//! Script persistence.

use std::path::{Path, PathBuf};

use blockscript_lang::document::{from_json, to_json};
use blockscript_lang::{ActorId, DocumentError, Script};
use hashbrown::HashMap;
use thiserror::Error;

/// Storage error type.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored document could not be read back.
    #[error("corrupt script document: {0}")]
    Document(#[from] DocumentError),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Where scripts live between sessions. One document per owner.
pub trait ScriptStore: Send {
    /// Load the owner's script, `None` if they never saved one.
    fn load(&self, owner: ActorId) -> StoreResult<Option<Script>>;

    fn save(&mut self, script: &Script) -> StoreResult<()>;

    fn delete(&mut self, owner: ActorId) -> StoreResult<()>;

    /// Every owner with a stored script.
    fn owners(&self) -> StoreResult<Vec<ActorId>>;
}

/// Keeps serialized documents in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: HashMap<ActorId, String>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored JSON for `owner`.
    #[must_use]
    pub fn document(&self, owner: ActorId) -> Option<&str> {
        self.documents.get(&owner).map(String::as_str)
    }
}

impl ScriptStore for MemoryStore {
    fn load(&self, owner: ActorId) -> StoreResult<Option<Script>> {
        self.documents
            .get(&owner)
            .map(|json| from_json(json))
            .transpose()
            .map_err(StoreError::from)
    }

    fn save(&mut self, script: &Script) -> StoreResult<()> {
        self.documents.insert(script.owner_id, to_json(script)?);
        Ok(())
    }

    fn delete(&mut self, owner: ActorId) -> StoreResult<()> {
        self.documents.remove(&owner);
        Ok(())
    }

    fn owners(&self) -> StoreResult<Vec<ActorId>> {
        Ok(self.documents.keys().copied().collect())
    }
}

/// One `<owner>.json` file per script under a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open or create a store at the given directory.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, owner: ActorId) -> PathBuf {
        self.dir.join(format!("{owner}.json"))
    }
}

impl ScriptStore for JsonFileStore {
    fn load(&self, owner: ActorId) -> StoreResult<Option<Script>> {
        let path = self.path(owner);
        let json = match std::fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        tracing::trace!("Loaded script for {owner} from {}", path.display());
        Ok(Some(from_json(&json)?))
    }

    /// Writes to a temporary file first so a crash never leaves a half-written script.
    fn save(&mut self, script: &Script) -> StoreResult<()> {
        let path = self.path(script.owner_id);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, to_json(script)?)?;
        std::fs::rename(&tmp, &path)?;
        tracing::trace!("Persisted script for {} to {}", script.owner_id, path.display());
        Ok(())
    }

    fn delete(&mut self, owner: ActorId) -> StoreResult<()> {
        match std::fs::remove_file(self.path(owner)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn owners(&self) -> StoreResult<Vec<ActorId>> {
        let mut owners = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Ok(uuid) = stem.parse() {
                owners.push(ActorId::from_uuid(uuid));
            }
        }
        Ok(owners)
    }
}
