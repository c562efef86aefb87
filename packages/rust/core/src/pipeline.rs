//! End-to-end build pass: pages → extraction → partitions → artifacts.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use siteindex_artifacts::{ArtifactLayout, BuildManifest, persist};
use siteindex_markup::{MarkerTags, extract_page};
use siteindex_shared::{BuildSettings, ExtractedDocument, Result, SiteIndexError};

use crate::assembler::assemble;
use crate::hooks::BuildHooks;

/// Name of the rendered page file inside each page directory.
const PAGE_FILE: &str = "index.html";

/// Result of a build pass.
#[derive(Debug)]
pub struct BuildResult {
    /// Directory holding the default partition and the manifest.
    pub artifact_root: PathBuf,
    /// Pages that passed the page filter and were read.
    pub pages_scanned: usize,
    /// Pages that contained at least one document and were rewritten.
    pub pages_indexed: usize,
    /// Documents kept after filtering, across all partitions.
    pub documents: usize,
    /// The manifest that was written.
    pub manifest: BuildManifest,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting build status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each page has been scanned.
    fn page_scanned(&self, pathname: &str, current: usize, total: usize);
    /// Called when the build completes.
    fn done(&self, result: &BuildResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn page_scanned(&self, _pathname: &str, _current: usize, _total: usize) {}
    fn done(&self, _result: &BuildResult) {}
}

/// File holding the rendered HTML of `pathname`.
///
/// The root page (`""` or `/`) lives at `<out_dir>/index.html`.
pub fn page_file(out_dir: &Path, pathname: &str) -> PathBuf {
    let trimmed = pathname.trim_matches('/');
    if trimmed.is_empty() {
        out_dir.join(PAGE_FILE)
    } else {
        out_dir.join(trimmed).join(PAGE_FILE)
    }
}

/// Run the build pass over `pages`.
///
/// 1. Scan every page passing the page filter, strictly in order
/// 2. Assemble all partitions in memory and check their artifact paths
/// 3. Rewrite pages that contained markers
/// 4. Persist the artifact pairs, then the manifest
///
/// Nothing on disk changes until every partition name has been accepted.
#[instrument(skip_all, fields(out_dir = %settings.out_dir.display(), pages = pages.len()))]
pub async fn build_site(
    settings: &BuildSettings,
    hooks: &BuildHooks,
    pages: &[String],
    progress: &dyn ProgressReporter,
) -> Result<BuildResult> {
    let start = Instant::now();
    let tags = MarkerTags::with_prefix(&settings.marker_prefix);

    info!(out_dir = %settings.out_dir.display(), "starting build");

    // --- Phase 1: Extraction ---
    progress.phase("Extracting documents");
    let mut documents: Vec<ExtractedDocument> = Vec::new();
    let mut rewrites: Vec<(PathBuf, String)> = Vec::new();
    let mut pages_scanned = 0;

    for (i, pathname) in pages.iter().enumerate() {
        if !hooks.accepts_page(pathname) {
            debug!(%pathname, "page filtered out");
            continue;
        }

        let path = page_file(&settings.out_dir, pathname);
        let html = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| SiteIndexError::io(&path, e))?;
        pages_scanned += 1;

        let extraction = extract_page(&html, pathname, &tags);
        if !extraction.documents.is_empty() {
            let count = extraction.documents.len();
            if settings.verbose {
                info!(%pathname, count, "indexing {count} doc(s) from {pathname}");
            } else {
                debug!(%pathname, count, "indexing {count} doc(s) from {pathname}");
            }

            documents.extend(extraction.documents);
            rewrites.push((path, extraction.html));
        }

        progress.page_scanned(pathname, i + 1, pages.len());
    }

    // --- Phase 2: Assembly ---
    progress.phase("Building indexes");
    let pairs = assemble(documents, hooks)?;
    let document_count = pairs.iter().map(|p| p.documents.len()).sum();

    let layout = ArtifactLayout::new(settings.artifact_root());
    for pair in &pairs {
        layout.partition_dir(&pair.index)?;
    }

    // --- Phase 3: Rewrite pages ---
    progress.phase("Rewriting pages");
    let pages_indexed = rewrites.len();
    for (path, html) in rewrites {
        tokio::fs::write(&path, html)
            .await
            .map_err(|e| SiteIndexError::io(&path, e))?;
    }

    // --- Phase 4: Persist ---
    progress.phase("Writing artifacts");
    let manifest = persist(&layout, &pairs)?;

    let result = BuildResult {
        artifact_root: layout.root().to_path_buf(),
        pages_scanned,
        pages_indexed,
        documents: document_count,
        manifest,
        elapsed: start.elapsed(),
    };

    progress.done(&result);

    info!(
        pages_scanned = result.pages_scanned,
        pages_indexed = result.pages_indexed,
        documents = result.documents,
        partitions = result.manifest.partitions.len(),
        elapsed_ms = result.elapsed.as_millis(),
        "build complete"
    );

    Ok(result)
}

/// Find every rendered page under `out_dir`, as sorted pathnames.
///
/// `skip` (typically the artifact directory) is not descended into unless it
/// is `out_dir` itself.
pub async fn discover_pages(out_dir: &Path, skip: Option<&Path>) -> Result<Vec<String>> {
    let skip = skip.filter(|dir| *dir != out_dir);
    let mut pages = Vec::new();
    let mut stack = vec![out_dir.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| SiteIndexError::io(&dir, e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SiteIndexError::io(&dir, e))?
        {
            let path = entry.path();
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| SiteIndexError::io(&path, e))?;

            if file_type.is_dir() {
                if skip != Some(path.as_path()) {
                    stack.push(path);
                }
            } else if file_type.is_file() && entry.file_name() == PAGE_FILE {
                match pathname_of(out_dir, &dir) {
                    Some(pathname) => pages.push(pathname),
                    None => warn!(path = %path.display(), "skipping page with non UTF-8 path"),
                }
            }
        }
    }

    pages.sort();
    debug!(count = pages.len(), "discovered pages");
    Ok(pages)
}

fn pathname_of(out_dir: &Path, dir: &Path) -> Option<String> {
    let relative = dir.strip_prefix(out_dir).ok()?;
    let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}
