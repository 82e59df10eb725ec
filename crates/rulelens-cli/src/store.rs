use rulelens_core::Snapshot;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Session snapshots kept as `<dir>/<name>.json`.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub const RESOLVER: &'static str = "resolver_state";
    pub const GENERATOR: &'static str = "generate_state";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// Saved snapshot, or an empty one when nothing usable is stored.
    pub fn load(&self, name: &str) -> Result<Snapshot, StoreError> {
        let path = self.path(name);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Snapshot::default()),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        match serde_json::from_str(&content) {
            Ok(snapshot) => Ok(snapshot),
            Err(err) => {
                tracing::warn!(path = %path.display(), "ignoring unreadable snapshot: {err}");
                Ok(Snapshot::default())
            }
        }
    }

    pub fn save(&self, name: &str, snapshot: &Snapshot) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.path(name);
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        fs::write(&path, bytes).map_err(|source| StoreError::Io { path: path.clone(), source })?;
        tracing::debug!(path = %path.display(), "saved snapshot");
        Ok(())
    }
}
