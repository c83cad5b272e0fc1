//! Persistent page cache for incremental builds.
//!
//! One JSON file per (namespace, key) under `<workDir>/cache/`, holding a
//! page's last known remote edit time and its transformed content tree.
//! The cache answers the one question the pipeline asks before fetching:
//! is this page stale?

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::tree::ContentNode;

/// Namespace for page content trees.
pub const CONTENT_NAMESPACE: &str = "notion";

#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    #[error("failed to write cache entry {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("failed to serialize cache entry {0}: {1}")]
    Serialize(PathBuf, serde_json::Error),
}

/// One cached page: the remote edit time recorded at write time plus the
/// transformed tree.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    last_edited_time: i64,
    tree: ContentNode,
}

#[derive(Serialize)]
struct CacheEntryRef<'a> {
    last_edited_time: i64,
    tree: &'a ContentNode,
}

pub struct Cache {
    root: PathBuf,
}

impl Cache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Whether the remote copy is newer than the cached one.
    ///
    /// True if no entry exists for (namespace, key), if the entry cannot be
    /// read, or if its recorded timestamp is strictly older than
    /// `remote_time`.
    pub fn should_update(&self, namespace: &str, key: &str, remote_time: i64) -> bool {
        match self.read_entry(namespace, key) {
            Some(entry) => entry.last_edited_time < remote_time,
            None => true,
        }
    }

    /// Load the cached tree, if a readable entry exists.
    pub fn get(&self, namespace: &str, key: &str) -> Option<ContentNode> {
        self.read_entry(namespace, key).map(|entry| entry.tree)
    }

    /// Store a tree with the page's current remote edit time, overwriting
    /// any prior entry.
    pub fn set(
        &self,
        namespace: &str,
        key: &str,
        last_edited_time: i64,
        tree: &ContentNode,
    ) -> Result<(), CacheError> {
        let path = self.entry_path(namespace, key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::Write(path.clone(), e))?;
        }
        let json = serde_json::to_string(&CacheEntryRef {
            last_edited_time,
            tree,
        })
        .map_err(|e| CacheError::Serialize(path.clone(), e))?;
        std::fs::write(&path, json).map_err(|e| CacheError::Write(path, e))
    }

    fn entry_path(&self, namespace: &str, key: &str) -> PathBuf {
        self.root.join(namespace).join(format!("{key}.json"))
    }

    fn read_entry(&self, namespace: &str, key: &str) -> Option<CacheEntry> {
        let content = std::fs::read_to_string(self.entry_path(namespace, key)).ok()?;
        serde_json::from_str(&content).ok()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::super::tree::NodeKind;
    use super::*;

    fn sample_tree() -> ContentNode {
        ContentNode {
            id: "0297b381-142d-4bdf-b534-cbbc043353ac".to_string(),
            uri: "https://www.notion.so/0297b381142d4bdfb534cbbc043353ac".to_string(),
            kind: NodeKind::Container,
            properties: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    #[test]
    fn test_should_update_missing_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path());
        assert!(cache.should_update(CONTENT_NAMESPACE, "k", 100));
    }

    #[test]
    fn test_should_update_compares_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path());
        cache
            .set(CONTENT_NAMESPACE, "k", 100, &sample_tree())
            .unwrap();

        // Unchanged remote timestamp: fresh.
        assert!(!cache.should_update(CONTENT_NAMESPACE, "k", 100));
        // Older remote timestamp: still fresh.
        assert!(!cache.should_update(CONTENT_NAMESPACE, "k", 99));
        // Strictly newer remote timestamp: stale.
        assert!(cache.should_update(CONTENT_NAMESPACE, "k", 101));
    }

    #[test]
    fn test_get_round_trips_tree() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path());
        let tree = sample_tree();
        cache.set(CONTENT_NAMESPACE, "k", 100, &tree).unwrap();
        assert_eq!(cache.get(CONTENT_NAMESPACE, "k").unwrap(), tree);
    }

    #[test]
    fn test_get_missing_or_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path());
        assert!(cache.get(CONTENT_NAMESPACE, "k").is_none());

        let entry_dir = dir.path().join(CONTENT_NAMESPACE);
        std::fs::create_dir_all(&entry_dir).unwrap();
        std::fs::write(entry_dir.join("k.json"), "{ not json").unwrap();
        assert!(cache.get(CONTENT_NAMESPACE, "k").is_none());
        // Corrupt entries also count as stale.
        assert!(cache.should_update(CONTENT_NAMESPACE, "k", 0));
    }

    #[test]
    fn test_set_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path());
        cache
            .set(CONTENT_NAMESPACE, "k", 100, &sample_tree())
            .unwrap();
        cache
            .set(CONTENT_NAMESPACE, "k", 200, &sample_tree())
            .unwrap();
        assert!(!cache.should_update(CONTENT_NAMESPACE, "k", 200));
    }

    #[test]
    fn test_namespaces_are_disjoint() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path());
        cache.set("one", "k", 100, &sample_tree()).unwrap();
        assert!(cache.should_update("two", "k", 50));
        assert!(cache.get("two", "k").is_none());
    }
}
