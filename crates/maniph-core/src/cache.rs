use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// What a cached identifier was looked up as. The kind is part of the cache
/// key so a project and a user sharing a name never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    User,
    Project,
    Column,
    Milestone,
}

impl LookupKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LookupKind::User => "user",
            LookupKind::Project => "project",
            LookupKind::Column => "column",
            LookupKind::Milestone => "milestone",
        }
    }
}

/// Persistent (lookup kind, lookup key) -> PHID store.
///
/// Loaded once at startup and written back on drop; a missing or corrupt
/// backing file degrades to an empty cache rather than failing the command.
/// Concurrent invocations are not coordinated: the last process to exit
/// wins, which is fine for a single interactive user.
#[derive(Debug)]
pub struct IdentifierCache {
    path: PathBuf,
    entries: HashMap<String, String>,
    dirty: bool,
}

impl IdentifierCache {
    pub fn load(path: PathBuf) -> Self {
        let entries = fs::read_to_string(&path)
            .ok()
            .and_then(|text| serde_json::from_str::<HashMap<String, String>>(&text).ok())
            .unwrap_or_default();
        Self {
            path,
            entries,
            dirty: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, kind: LookupKind, key: &str) -> Option<&str> {
        self.entries.get(&slot(kind, key)).map(String::as_str)
    }

    pub fn put(&mut self, kind: LookupKind, key: &str, phid: &str) {
        self.entries.insert(slot(kind, key), phid.to_string());
        self.dirty = true;
    }

    /// Forget every entry and delete the backing file. The in-memory cache
    /// is marked clean so drop does not write it back.
    pub fn clear(&mut self) -> io::Result<()> {
        self.entries.clear();
        self.dirty = false;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_string_pretty(&self.entries)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        fs::write(&self.path, body)?;
        self.dirty = false;
        Ok(())
    }
}

impl Drop for IdentifierCache {
    fn drop(&mut self) {
        // Best effort: a cache that fails to persist only costs a re-lookup.
        let _ = self.flush();
    }
}

fn slot(kind: LookupKind, key: &str) -> String {
    format!("{}/{}", kind.as_str(), key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_empty() {
        let temp = TempDir::new().expect("tempdir");
        let cache = IdentifierCache::load(temp.path().join("cache.json"));
        assert!(cache.is_empty());
        assert_eq!(cache.get(LookupKind::User, "brouberol"), None);
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("cache.json");
        fs::write(&path, "{not json").expect("write");
        let cache = IdentifierCache::load(path);
        assert!(cache.is_empty());
    }

    #[test]
    fn put_get_round_trip_across_loads() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("cache.json");
        {
            let mut cache = IdentifierCache::load(path.clone());
            cache.put(LookupKind::User, "brouberol", "PHID-USER-abc");
            cache.flush().expect("flush");
        }
        let cache = IdentifierCache::load(path);
        assert_eq!(
            cache.get(LookupKind::User, "brouberol"),
            Some("PHID-USER-abc")
        );
    }

    #[test]
    fn kinds_do_not_collide() {
        let temp = TempDir::new().expect("tempdir");
        let mut cache = IdentifierCache::load(temp.path().join("cache.json"));
        cache.put(LookupKind::User, "sre", "PHID-USER-1");
        cache.put(LookupKind::Project, "sre", "PHID-PROJ-1");
        assert_eq!(cache.get(LookupKind::User, "sre"), Some("PHID-USER-1"));
        assert_eq!(cache.get(LookupKind::Project, "sre"), Some("PHID-PROJ-1"));
    }

    #[test]
    fn drop_persists_dirty_entries() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("cache.json");
        {
            let mut cache = IdentifierCache::load(path.clone());
            cache.put(LookupKind::Column, "PHID-PROJ-1/done", "PHID-PCOL-9");
        }
        let cache = IdentifierCache::load(path);
        assert_eq!(
            cache.get(LookupKind::Column, "PHID-PROJ-1/done"),
            Some("PHID-PCOL-9")
        );
    }

    #[test]
    fn clear_removes_file_and_entries() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("cache.json");
        let mut cache = IdentifierCache::load(path.clone());
        cache.put(LookupKind::Milestone, "PHID-PROJ-1", "PHID-PROJ-2");
        cache.flush().expect("flush");
        assert!(path.exists());
        cache.clear().expect("clear");
        assert!(!path.exists());
        assert!(cache.is_empty());
        drop(cache);
        // Drop after clear must not resurrect the file.
        assert!(!path.exists());
    }

    #[test]
    fn clear_tolerates_missing_file() {
        let temp = TempDir::new().expect("tempdir");
        let mut cache = IdentifierCache::load(temp.path().join("cache.json"));
        cache.clear().expect("clear");
    }

    #[test]
    fn flush_creates_parent_directories() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("nested").join("dir").join("cache.json");
        let mut cache = IdentifierCache::load(path.clone());
        cache.put(LookupKind::User, "alice", "PHID-USER-a");
        cache.flush().expect("flush");
        assert!(path.exists());
    }
}
