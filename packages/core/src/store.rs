//! Persistence for polling snapshots.
//!
//! A stored state can be resumed by a different process. The stores do not
//! lock across processes: whoever resumes a state must make sure the process
//! that saved it has stopped polling it. At most one poller per state.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::Error;
use crate::state::PollingState;

/// A keyed home for polling states.
pub trait StateStore: Send + Sync {
    /// Save a snapshot, replacing any previous one under the same key.
    fn save(&self, key: &str, state: &PollingState) -> Result<(), Error>;

    /// Load a snapshot. `Ok(None)` if nothing was saved under `key`.
    fn load(&self, key: &str) -> Result<Option<PollingState>, Error>;

    /// Forget a snapshot. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), Error>;
}

/// Keeps states as serialized JSON, so a load goes through the same
/// decoding path as a state read from disk.
#[derive(Default)]
pub struct InMemoryStateStore {
    states: Mutex<HashMap<String, String>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map still holds whole strings.
        self.states.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StateStore for InMemoryStateStore {
    fn save(&self, key: &str, state: &PollingState) -> Result<(), Error> {
        validate_key(key)?;
        let json = state.to_json()?;
        self.lock().insert(key.to_string(), json);
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<PollingState>, Error> {
        validate_key(key)?;
        self.lock()
            .get(key)
            .map(|json| PollingState::from_json(json))
            .transpose()
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        validate_key(key)?;
        self.lock().remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per state under a root directory.
pub struct FileStateStore {
    root: PathBuf,
}

impl FileStateStore {
    /// The root must be an existing, writable directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, Error> {
        let root = root.into();
        let attr = fs::metadata(&root)?;

        if !attr.is_dir() {
            return Err(io::Error::other(format!(
                "State store root {} is not a directory",
                root.display()
            ))
            .into());
        }

        if attr.permissions().readonly() {
            return Err(io::Error::other(format!(
                "State store root {} is not writable",
                root.display()
            ))
            .into());
        }

        Ok(Self {
            root: root.canonicalize()?,
        })
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn file_path(&self, key: &str) -> Result<PathBuf, Error> {
        validate_key(key)?;
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl StateStore for FileStateStore {
    fn save(&self, key: &str, state: &PollingState) -> Result<(), Error> {
        let file_path = self.file_path(key)?;
        let tmp_path = self.root.join(format!(".{key}.json.tmp"));
        tracing::debug!(
            path = %file_path.display(),
            status = %state.status,
            "writing polling state"
        );

        let json = state.to_json()?;
        {
            let mut f = fs::File::create(&tmp_path)?;
            f.write_all(json.as_bytes())?;
            f.sync_all()?;
        }
        fs::rename(&tmp_path, &file_path)?;
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<PollingState>, Error> {
        let file_path = self.file_path(key)?;
        tracing::debug!(path = %file_path.display(), "reading polling state");

        match fs::read_to_string(&file_path) {
            Ok(text) => PollingState::from_json(&text).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        let file_path = self.file_path(key)?;
        match fs::remove_file(&file_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn validate_key(key: &str) -> Result<(), Error> {
    let invalid = key.is_empty()
        || key == "."
        || key.contains("..")
        || key.contains(['/', '\\', '\0']);

    if invalid {
        return Err(Error::InvalidKey {
            key: key.to_string(),
        });
    }
    Ok(())
}
