//! Partition assembler.
//!
//! Groups extracted documents by index key, builds one search index per
//! partition, and produces the in-memory [`ArtifactPair`]s that the
//! pipeline persists.

use std::collections::HashMap;

use tracing::{debug, instrument};

use siteindex_artifacts::ArtifactPair;
use siteindex_search::IndexBuilder;
use siteindex_shared::{DocumentRecord, ExtractedDocument, IndexKey, Result};

use crate::hooks::BuildHooks;

/// Documents of one index key, in encounter order, ids assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub index: IndexKey,
    pub documents: Vec<DocumentRecord>,
}

/// Filter, group and assign ids.
///
/// Partitions are returned in the order their key was first seen.
pub fn partition(documents: Vec<ExtractedDocument>, hooks: &BuildHooks) -> Vec<Partition> {
    let mut partitions: Vec<Partition> = Vec::new();
    let mut slots: HashMap<IndexKey, usize> = HashMap::new();

    for doc in documents {
        if !hooks.accepts_document(&doc) {
            debug!(url = %doc.canonical_url, index = %doc.index, "document filtered out");
            continue;
        }

        let (index, record) = doc.into_record();
        let slot = *slots.entry(index.clone()).or_insert_with(|| {
            partitions.push(Partition {
                index,
                documents: Vec::new(),
            });
            partitions.len() - 1
        });
        partitions[slot].documents.push(record);
    }

    partitions
}

/// Build the index and the mapped document list of one partition.
///
/// The index sees the records as extracted; the mapping hook only shapes
/// what lands in `docs.json`.
#[instrument(skip_all, fields(index = %partition.index, documents = partition.documents.len()))]
pub fn build_artifacts(partition: Partition, hooks: &BuildHooks) -> Result<ArtifactPair> {
    let mut builder = IndexBuilder::new();
    hooks.initialize(&mut builder)?;

    for record in &partition.documents {
        builder.add(record);
    }
    let index_json = builder.build().to_json()?;

    let documents = partition
        .documents
        .into_iter()
        .map(|record| hooks.map_document(record))
        .collect();

    Ok(ArtifactPair {
        index: partition.index,
        index_json,
        documents,
    })
}

/// Partition `documents` and build every artifact pair in memory.
pub fn assemble(documents: Vec<ExtractedDocument>, hooks: &BuildHooks) -> Result<Vec<ArtifactPair>> {
    partition(documents, hooks)
        .into_iter()
        .map(|p| build_artifacts(p, hooks))
        .collect()
}
