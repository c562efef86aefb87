//! On-disk search artifacts.
//!
//! - [`layout`]: partition directories under the artifact root
//! - [`writer`]: atomic persistence of [`ArtifactPair`]s
//! - [`manifest`]: the `manifest.json` written after every build

pub mod layout;
pub mod manifest;
pub mod writer;

pub use layout::{ArtifactLayout, MANIFEST_FILE};
pub use manifest::{
    ArtifactMeta, BuildManifest, MANIFEST_VERSION, PartitionMeta, read_manifest,
};
pub use writer::{ArtifactPair, persist, write_atomic};
