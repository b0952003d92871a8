//! Filesystem backend: one JSON file per key.
//!
//! Keys may contain characters that are not filesystem-safe (the
//! snapshotter uses `/`-namespaced keys), so filenames are the
//! URL-safe base64 encoding of the key plus a `.json` suffix. Files
//! that do not decode back to a key are ignored by `keys()` rather
//! than failing the listing.
//!
//! This is a reference durable backend, not a storage format
//! contract. The buffered store works identically against any other
//! [`StoreBackend`].

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ledger_core::{Error, JsonValue, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::backend::StoreBackend;

/// Durable backend storing each key as a JSON file in one directory.
#[derive(Debug)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Open a file backend rooted at `dir`, creating it if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Directory this backend writes into.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name = format!("{}.json", URL_SAFE_NO_PAD.encode(key));
        self.dir.join(name)
    }

    fn key_for(file_name: &str) -> Option<String> {
        let encoded = file_name.strip_suffix(".json")?;
        let bytes = URL_SAFE_NO_PAD.decode(encoded).ok()?;
        String::from_utf8(bytes).ok()
    }
}

impl StoreBackend for FileBackend {
    fn load(&self, key: &str) -> Result<JsonValue> {
        let path = self.path_for(key);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::not_found(key));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn store(&self, key: &str, value: &JsonValue) -> Result<()> {
        let path = self.path_for(key);
        let bytes = serde_json::to_vec(value)?;
        std::fs::write(&path, bytes)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            match Self::key_for(name) {
                Some(key) => keys.push(key),
                None => debug!(file = name, "skipping non-store file"),
            }
        }
        Ok(keys)
    }
}
