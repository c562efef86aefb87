//! Runtime search client.
//!
//! Fetches a partition's `idx.json` / `docs.json` on first use, caches them
//! for the life of the [`SearchClient`], and pairs raw hits with their records.

pub mod client;
pub mod source;

pub use client::{DocumentMap, EnrichedHit, SearchClient};
pub use source::{ArtifactSource, DirSource, HttpSource, join_path};
