//! Flat-file implementation of `MemoryBackend`.
//!
//! Layout inside the storage directory, one pair of files per key:
//!
//! ```text
//! <safe-key>-<hash8>            {"key": "<original key>", "value": <value>}
//! <safe-key>-<hash8>.metadata   <metadata object>
//! ```
//!
//! `safe-key` is the key with every character outside `[A-Za-z0-9_.-]`
//! replaced by `_`. The 8-hex-digit SHA-256 prefix of the original key keeps
//! keys that sanitize to the same string apart. The original key is stored
//! inside the value file so `list` can return it unchanged.
//!
//! Writes are staged as `<file>.tmp` and renamed into place, metadata first,
//! so a failed write never pairs a new value with stale metadata.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, error, info};

use atrian_contracts::{
    error::{AtrianError, AtrianResult},
    memory::{Metadata, StoredEntry},
};
use atrian_core::traits::MemoryBackend;

const METADATA_SUFFIX: &str = ".metadata";
const STAGING_SUFFIX: &str = ".tmp";

static UNSAFE_KEY_CHARS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"[^\w\-\.]").ok());

#[derive(Serialize, Deserialize)]
struct ValueFile {
    key: String,
    value: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct LocalFileBackend {
    dir: PathBuf,
}

impl LocalFileBackend {
    /// Open (creating if needed) a storage directory.
    pub fn open(dir: impl Into<PathBuf>) -> AtrianResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| storage_error("create", &dir, e))?;
        info!(dir = %dir.display(), "local memory backend ready");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.dir.join(file_stem(key))
    }

    pub(crate) fn metadata_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}{}", file_stem(key), METADATA_SUFFIX))
    }

    fn read_value_file(&self, path: &Path) -> AtrianResult<Option<ValueFile>> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_error("read", path, e)),
        }
    }
}

/// File name for a key, without directory or metadata suffix.
fn file_stem(key: &str) -> String {
    let safe = match UNSAFE_KEY_CHARS.as_ref() {
        Some(re) => re.replace_all(key, "_").into_owned(),
        None => key
            .chars()
            .map(|c| if c.is_alphanumeric() || "_-.".contains(c) { c } else { '_' })
            .collect(),
    };
    let digest = hex::encode(Sha256::digest(key.as_bytes()));
    format!("{}-{}", safe, &digest[..8])
}

fn storage_error(action: &str, path: &Path, e: std::io::Error) -> AtrianError {
    AtrianError::Storage {
        reason: format!("failed to {} '{}': {}", action, path.display(), e),
    }
}

pub(crate) fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(STAGING_SUFFIX);
    PathBuf::from(name)
}

fn stage(path: &Path, contents: &str) -> AtrianResult<PathBuf> {
    let staged = staging_path(path);
    fs::write(&staged, contents).map_err(|e| storage_error("write", &staged, e))?;
    Ok(staged)
}

fn commit(staged: &Path, path: &Path) -> AtrianResult<()> {
    fs::rename(staged, path).map_err(|e| storage_error("rename", staged, e))
}

fn remove_if_exists(path: &Path) -> AtrianResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(storage_error("remove", path, e)),
    }
}

impl MemoryBackend for LocalFileBackend {
    fn store(&self, key: &str, value: &serde_json::Value, metadata: &Metadata) -> AtrianResult<()> {
        let body = ValueFile {
            key: key.to_string(),
            value: value.clone(),
        };
        let value_path = self.value_path(key);
        let metadata_path = self.metadata_path(key);

        let value_text = serde_json::to_string_pretty(&body)?;
        let metadata_text = serde_json::to_string_pretty(metadata)?;

        let staged_value = stage(&value_path, &value_text)?;
        let staged_metadata = stage(&metadata_path, &metadata_text).inspect_err(|_| {
            let _ = fs::remove_file(&staged_value);
        })?;

        commit(&staged_metadata, &metadata_path)?;
        commit(&staged_value, &value_path)?;

        debug!(key = %key, path = %value_path.display(), "stored entry");
        Ok(())
    }

    fn retrieve(&self, key: &str) -> AtrianResult<Option<StoredEntry>> {
        let Some(body) = self.read_value_file(&self.value_path(key))? else {
            return Ok(None);
        };

        let metadata_path = self.metadata_path(key);
        let metadata = match fs::read_to_string(&metadata_path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == ErrorKind::NotFound => Metadata::new(),
            Err(e) => return Err(storage_error("read", &metadata_path, e)),
        };

        Ok(Some(StoredEntry {
            value: body.value,
            metadata,
        }))
    }

    fn list(&self, prefix: &str) -> AtrianResult<Vec<String>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| storage_error("list", &self.dir, e))?;

        let mut keys = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| storage_error("list", &self.dir, e))?.path();
            let is_auxiliary = path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(true, |n| n.ends_with(METADATA_SUFFIX) || n.ends_with(STAGING_SUFFIX));
            if is_auxiliary || !path.is_file() {
                continue;
            }
            match self.read_value_file(&path) {
                Ok(Some(body)) if body.key.starts_with(prefix) => keys.push(body.key),
                Ok(_) => {}
                Err(e) => error!(path = %path.display(), error = %e, "skipping unreadable entry"),
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn delete(&self, key: &str) -> AtrianResult<bool> {
        let existed = remove_if_exists(&self.value_path(key))?;
        remove_if_exists(&self.metadata_path(key))?;
        Ok(existed)
    }

    fn clear(&self, prefix: &str) -> AtrianResult<usize> {
        let mut removed = 0;
        for key in self.list(prefix)? {
            if self.delete(&key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::file_stem;

    #[test]
    fn test_file_stem_is_filesystem_safe_and_distinct() {
        let a = file_stem("atrian:trust:alice");
        let b = file_stem("atrian_trust_alice");
        assert!(a.starts_with("atrian_trust_alice-"));
        assert!(b.starts_with("atrian_trust_alice-"));
        assert_ne!(a, b);
        assert!(!file_stem("../../etc/passwd").contains('/'));
    }
}
