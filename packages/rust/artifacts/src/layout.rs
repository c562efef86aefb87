//! Where each partition's artifacts live on disk.

use std::path::{Component, Path, PathBuf};

use siteindex_shared::{DOCS_FILE, INDEX_FILE, IndexKey, Result, SiteIndexError};

/// File name of the build manifest in the artifact root.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Directory layout rooted at the artifact directory.
///
/// ```text
/// <root>/
/// ├── manifest.json
/// ├── idx.json          (default partition)
/// ├── docs.json
/// └── <index>/
///     ├── idx.json
///     └── docs.json
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// Directory holding the artifacts of `key`.
    ///
    /// Named partitions must be plain relative paths; `..`, absolute paths
    /// and drive prefixes are rejected.
    pub fn partition_dir(&self, key: &IndexKey) -> Result<PathBuf> {
        let Some(name) = key.name() else {
            return Ok(self.root.clone());
        };

        let safe = Path::new(name)
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(SiteIndexError::validation(format!(
                "index name {name:?} is not a plain relative path"
            )));
        }

        Ok(self.root.join(name))
    }

    pub fn index_path(&self, key: &IndexKey) -> Result<PathBuf> {
        Ok(self.partition_dir(key)?.join(INDEX_FILE))
    }

    pub fn docs_path(&self, key: &IndexKey) -> Result<PathBuf> {
        Ok(self.partition_dir(key)?.join(DOCS_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_partition_uses_root() {
        let layout = ArtifactLayout::new("/site/search");
        let key = IndexKey::default_partition();
        assert_eq!(
            layout.index_path(&key).unwrap(),
            PathBuf::from("/site/search/idx.json")
        );
        assert_eq!(
            layout.manifest_path(),
            PathBuf::from("/site/search/manifest.json")
        );
    }

    #[test]
    fn named_partition_uses_subdirectory() {
        let layout = ArtifactLayout::new("/site/search");
        let key = IndexKey::named("blog");
        assert_eq!(
            layout.docs_path(&key).unwrap(),
            PathBuf::from("/site/search/blog/docs.json")
        );
    }

    #[test]
    fn traversal_names_are_rejected() {
        let layout = ArtifactLayout::new("/site/search");
        for name in ["../etc", "a/../../b", "/abs"] {
            let err = layout.partition_dir(&IndexKey::named(name)).unwrap_err();
            assert!(err.to_string().contains("not a plain relative path"), "{name}");
        }
    }
}
