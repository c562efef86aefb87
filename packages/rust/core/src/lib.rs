//! Build orchestration for siteindex.
//!
//! This crate ties together marker extraction, partition assembly, and
//! artifact persistence into the end-to-end [`build_site`] pass.

pub mod assembler;
pub mod hooks;
pub mod pipeline;

pub use assembler::{Partition, assemble, build_artifacts, partition};
pub use hooks::{BuildHooks, DocumentFilter, DocumentMapper, IndexInitializer, PageFilter};
pub use pipeline::{
    BuildResult, ProgressReporter, SilentProgress, build_site, discover_pages, page_file,
};
