//! Build manifest: what the last build wrote and with which checksums.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use siteindex_shared::{IndexKey, Result, SiteIndexError};

use crate::layout::ArtifactLayout;

/// Manifest format version.
pub const MANIFEST_VERSION: u32 = 1;

/// Metadata for a single artifact file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    /// Path relative to the artifact root, `/`-separated.
    pub filename: String,
    pub sha256: String,
    pub size_bytes: usize,
}

/// One persisted partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionMeta {
    /// `null` for the default partition.
    pub index: IndexKey,
    pub document_count: usize,
    pub files: Vec<ArtifactMeta>,
}

/// Contents of `manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildManifest {
    pub version: u32,
    pub build_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub partitions: Vec<PartitionMeta>,
}

impl BuildManifest {
    pub fn new(partitions: Vec<PartitionMeta>) -> Self {
        Self {
            version: MANIFEST_VERSION,
            build_id: Uuid::now_v7(),
            created_at: Utc::now(),
            partitions,
        }
    }

    pub fn document_count(&self) -> usize {
        self.partitions.iter().map(|p| p.document_count).sum()
    }

    pub fn partition(&self, key: &IndexKey) -> Option<&PartitionMeta> {
        self.partitions.iter().find(|p| &p.index == key)
    }
}

/// Read and validate the manifest of a previous build.
pub fn read_manifest(layout: &ArtifactLayout) -> Result<BuildManifest> {
    read_manifest_at(&layout.manifest_path())
}

fn read_manifest_at(path: &Path) -> Result<BuildManifest> {
    let content = std::fs::read_to_string(path).map_err(|e| SiteIndexError::io(path, e))?;

    let manifest: BuildManifest = serde_json::from_str(&content)
        .map_err(|e| SiteIndexError::validation(format!("invalid manifest.json: {e}")))?;

    if manifest.version != MANIFEST_VERSION {
        return Err(SiteIndexError::validation(format!(
            "unsupported manifest version: {} (expected {MANIFEST_VERSION})",
            manifest.version
        )));
    }

    Ok(manifest)
}
