//! Persisting artifact pairs.
//!
//! Every file is written to a dot-prefixed temp file in its target directory
//! and renamed into place, so readers never observe a half-written artifact.
//! The manifest goes last, after which partitions of the previous build that
//! are no longer produced are removed.

use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use siteindex_shared::{DOCS_FILE, DocumentRecord, INDEX_FILE, IndexKey, Result, SiteIndexError};

use crate::layout::{ArtifactLayout, MANIFEST_FILE};
use crate::manifest::{ArtifactMeta, BuildManifest, PartitionMeta, read_manifest};

/// The two artifacts of one partition, assembled in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPair {
    pub index: IndexKey,
    /// Serialized search index (`idx.json`).
    pub index_json: String,
    /// Post-mapping records (`docs.json`), in partition order.
    pub documents: Vec<DocumentRecord>,
}

impl ArtifactPair {
    /// Serialize the document list as written to `docs.json`.
    pub fn docs_json(&self) -> Result<String> {
        serde_json::to_string(&self.documents)
            .map_err(|e| SiteIndexError::validation(format!("JSON serialization failed: {e}")))
    }
}

/// Write every pair under `layout`, then the build manifest.
///
/// Nothing is written until all pairs have been serialized.
#[instrument(skip_all, fields(root = %layout.root().display(), partitions = pairs.len()))]
pub fn persist(layout: &ArtifactLayout, pairs: &[ArtifactPair]) -> Result<BuildManifest> {
    let previous = previous_partitions(layout);

    let mut staged = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let dir = layout.partition_dir(&pair.index)?;
        staged.push((pair, dir, pair.docs_json()?));
    }

    let mut partitions = Vec::with_capacity(pairs.len());
    for (pair, dir, docs_json) in staged {
        let prefix = pair
            .index
            .name()
            .map(|name| format!("{name}/"))
            .unwrap_or_default();

        let files = vec![
            write_artifact(&dir, INDEX_FILE, &prefix, pair.index_json.as_bytes())?,
            write_artifact(&dir, DOCS_FILE, &prefix, docs_json.as_bytes())?,
        ];

        debug!(
            index = %pair.index,
            documents = pair.documents.len(),
            dir = %dir.display(),
            "persisted partition"
        );

        partitions.push(PartitionMeta {
            index: pair.index.clone(),
            document_count: pair.documents.len(),
            files,
        });
    }

    let manifest = BuildManifest::new(partitions);
    let json = serde_json::to_string_pretty(&manifest)
        .map_err(|e| SiteIndexError::validation(format!("JSON serialization failed: {e}")))?;
    write_atomic(layout.root(), MANIFEST_FILE, json.as_bytes())?;
    remove_stale(layout, &previous, &manifest.partitions)?;

    info!(
        build_id = %manifest.build_id,
        partitions = manifest.partitions.len(),
        documents = manifest.document_count(),
        "artifacts written"
    );

    Ok(manifest)
}

/// Partitions recorded by the manifest of the previous build, if any.
fn previous_partitions(layout: &ArtifactLayout) -> Vec<IndexKey> {
    if !layout.manifest_path().exists() {
        return Vec::new();
    }
    match read_manifest(layout) {
        Ok(manifest) => manifest.partitions.into_iter().map(|p| p.index).collect(),
        Err(e) => {
            warn!(error = %e, "ignoring unreadable previous manifest");
            Vec::new()
        }
    }
}

/// Delete the artifacts of previous partitions missing from `current`.
///
/// Only `idx.json` and `docs.json` are removed; a named partition's directory
/// goes too once it is empty.
fn remove_stale(layout: &ArtifactLayout, previous: &[IndexKey], current: &[PartitionMeta]) -> Result<()> {
    for key in previous {
        if current.iter().any(|p| &p.index == key) {
            continue;
        }
        let dir = match layout.partition_dir(key) {
            Ok(dir) => dir,
            Err(e) => {
                warn!(index = %key, error = %e, "not removing stale partition");
                continue;
            }
        };

        for file in [INDEX_FILE, DOCS_FILE] {
            let path = dir.join(file);
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(SiteIndexError::io(&path, e)),
            }
        }
        if key.name().is_some() {
            let _ = std::fs::remove_dir(&dir);
        }
        debug!(index = %key, dir = %dir.display(), "removed stale partition");
    }
    Ok(())
}

fn write_artifact(dir: &Path, filename: &str, prefix: &str, content: &[u8]) -> Result<ArtifactMeta> {
    write_atomic(dir, filename, content)?;

    let mut hasher = Sha256::new();
    hasher.update(content);

    Ok(ArtifactMeta {
        filename: format!("{prefix}{filename}"),
        sha256: format!("{:x}", hasher.finalize()),
        size_bytes: content.len(),
    })
}

/// Write `content` to `dir/filename` via a temp file and rename.
pub fn write_atomic(dir: &Path, filename: &str, content: &[u8]) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| SiteIndexError::io(dir, e))?;

    let target = dir.join(filename);
    let temp = dir.join(format!(".{filename}.tmp"));

    std::fs::write(&temp, content).map_err(|e| SiteIndexError::io(&temp, e))?;
    std::fs::rename(&temp, &target).map_err(|e| SiteIndexError::io(&target, e))?;

    debug!(path = %target.display(), size = content.len(), "wrote artifact");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "siteindex-artifacts-test-{}",
            uuid::Uuid::now_v7()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn record(id: &str) -> DocumentRecord {
        DocumentRecord {
            id: id.into(),
            canonical_url: format!("/{id}"),
            fields: BTreeMap::from([("title".to_string(), id.to_uppercase())]),
        }
    }

    fn pair(index: IndexKey, ids: &[&str]) -> ArtifactPair {
        ArtifactPair {
            index,
            index_json: r#"{"version":1}"#.into(),
            documents: ids.iter().map(|id| record(id)).collect(),
        }
    }

    #[test]
    fn persist_writes_partitions_and_manifest() {
        let tmp = temp_dir();
        let layout = ArtifactLayout::new(tmp.join("search"));
        let pairs = vec![
            pair(IndexKey::default_partition(), &["a", "b"]),
            pair(IndexKey::named("blog"), &["c"]),
        ];

        let manifest = persist(&layout, &pairs).unwrap();

        assert!(tmp.join("search/idx.json").exists());
        assert!(tmp.join("search/blog/idx.json").exists());

        let docs: Vec<DocumentRecord> = serde_json::from_str(
            &std::fs::read_to_string(tmp.join("search/docs.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(docs, pairs[0].documents);

        assert_eq!(manifest.document_count(), 3);
        let blog = manifest.partition(&IndexKey::named("blog")).unwrap();
        assert_eq!(blog.files[0].filename, "blog/idx.json");
        assert_eq!(blog.files[0].sha256.len(), 64);
        assert_eq!(blog.files[0].size_bytes, pairs[1].index_json.len());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn manifest_round_trips_from_disk() {
        let tmp = temp_dir();
        let layout = ArtifactLayout::new(&tmp);

        let written = persist(&layout, &[pair(IndexKey::default_partition(), &["a"])]).unwrap();
        let read = read_manifest(&layout).unwrap();
        assert_eq!(read, written);
        assert_eq!(read.partitions[0].index, IndexKey::default_partition());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn persist_leaves_no_temp_files() {
        let tmp = temp_dir();
        let layout = ArtifactLayout::new(&tmp);
        persist(&layout, &[pair(IndexKey::default_partition(), &["a"])]).unwrap();

        for entry in std::fs::read_dir(&tmp).unwrap() {
            let name = entry.unwrap().file_name().to_string_lossy().to_string();
            assert!(!name.starts_with('.'), "temp file left behind: {name}");
        }

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn invalid_partition_writes_nothing() {
        let tmp = temp_dir();
        let layout = ArtifactLayout::new(&tmp);
        let pairs = vec![
            pair(IndexKey::default_partition(), &["a"]),
            pair(IndexKey::named("../escape"), &["b"]),
        ];

        assert!(persist(&layout, &pairs).is_err());
        assert!(!tmp.join("idx.json").exists());
        assert!(!tmp.join("manifest.json").exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn persist_overwrites_previous_build() {
        let tmp = temp_dir();
        let layout = ArtifactLayout::new(&tmp);

        let first = persist(&layout, &[pair(IndexKey::default_partition(), &["a"])]).unwrap();
        let second =
            persist(&layout, &[pair(IndexKey::default_partition(), &["a", "b"])]).unwrap();

        assert_ne!(first.build_id, second.build_id);
        assert_eq!(read_manifest(&layout).unwrap().document_count(), 2);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rebuild_removes_partitions_no_longer_produced() {
        let tmp = temp_dir();
        let layout = ArtifactLayout::new(&tmp);
        std::fs::create_dir_all(tmp.join("docs/api")).unwrap();
        std::fs::write(tmp.join("docs/api/keep.txt"), "x").unwrap();

        persist(
            &layout,
            &[
                pair(IndexKey::default_partition(), &["a"]),
                pair(IndexKey::named("blog"), &["b"]),
                pair(IndexKey::named("docs"), &["c"]),
            ],
        )
        .unwrap();
        persist(&layout, &[pair(IndexKey::named("blog"), &["b"])]).unwrap();

        assert!(tmp.join("blog/idx.json").exists());
        assert!(!tmp.join("idx.json").exists());
        assert!(!tmp.join("docs.json").exists());
        assert!(!tmp.join("docs/idx.json").exists());
        assert!(tmp.join("docs/api/keep.txt").exists());
        assert!(tmp.join("manifest.json").exists());

        persist(&layout, &[]).unwrap();
        assert!(!tmp.join("blog").exists());
        assert!(read_manifest(&layout).unwrap().partitions.is_empty());

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
