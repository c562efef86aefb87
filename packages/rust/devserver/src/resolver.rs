//! Mapping dev-server request paths onto the last build's output.

use std::path::{Path, PathBuf};

use siteindex_shared::{DOCS_FILE, INDEX_FILE, Result, SiteIndexError};

/// Resolves artifact and static-file requests under the build output directory.
#[derive(Debug, Clone)]
pub struct ArtifactResolver {
    out_dir: PathBuf,
    base: String,
}

impl ArtifactResolver {
    /// `base` is the site's public base path (`/`, `/docs/`, `./`, ...).
    pub fn new(out_dir: impl Into<PathBuf>, base: &str) -> Self {
        let base = base.strip_prefix("./").unwrap_or(base).trim_matches('/');
        Self {
            out_dir: out_dir.into(),
            base: base.to_string(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Whether `request_path` names a search artifact.
    pub fn is_artifact_request(request_path: &str) -> bool {
        request_path.ends_with(&format!("/{INDEX_FILE}"))
            || request_path.ends_with(&format!("/{DOCS_FILE}"))
    }

    /// Map an artifact request to its file.
    ///
    /// `None` means the request is not for an artifact and should pass
    /// through. A file no build has produced is
    /// [`SiteIndexError::ArtifactNotBuilt`].
    pub fn resolve(&self, request_path: &str) -> Option<Result<PathBuf>> {
        if !Self::is_artifact_request(request_path) {
            return None;
        }

        Some(self.local_path(request_path).and_then(|path| {
            if path.is_file() {
                Ok(path)
            } else {
                Err(SiteIndexError::ArtifactNotBuilt { path })
            }
        }))
    }

    /// Path under the output directory for any request path.
    ///
    /// Strips the leading `/` and the site base; `..` segments are rejected.
    pub fn local_path(&self, request_path: &str) -> Result<PathBuf> {
        let mut relative = request_path.trim_start_matches('/');
        if !self.base.is_empty() {
            if relative == self.base {
                relative = "";
            } else if let Some(rest) = relative
                .strip_prefix(self.base.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
            {
                relative = rest;
            }
        }

        let mut path = self.out_dir.clone();
        for segment in relative.split('/').filter(|s| !s.is_empty() && *s != ".") {
            if segment == ".." || segment.contains('\\') {
                return Err(SiteIndexError::validation(format!(
                    "request path escapes the output directory: {request_path}"
                )));
            }
            path.push(segment);
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "siteindex-resolver-test-{}",
            uuid::Uuid::now_v7()
        ));
        std::fs::create_dir_all(dir.join("search/blog")).unwrap();
        std::fs::write(dir.join("search/idx.json"), "{}").unwrap();
        std::fs::write(dir.join("search/blog/docs.json"), "[]").unwrap();
        dir
    }

    #[test]
    fn non_artifact_requests_pass_through() {
        let resolver = ArtifactResolver::new("/dist", "/");
        assert!(resolver.resolve("/index.html").is_none());
        assert!(resolver.resolve("/search/idx.json.map").is_none());
        assert!(resolver.resolve("/").is_none());
    }

    #[test]
    fn resolves_existing_artifacts() {
        let tmp = temp_dir();
        let resolver = ArtifactResolver::new(&tmp, "/");

        let path = resolver.resolve("/search/idx.json").unwrap().unwrap();
        assert_eq!(path, tmp.join("search/idx.json"));
        let path = resolver.resolve("/search/blog/docs.json").unwrap().unwrap();
        assert_eq!(path, tmp.join("search/blog/docs.json"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn base_path_is_stripped() {
        let tmp = temp_dir();
        for base in ["/docs/", "./docs", "docs"] {
            let resolver = ArtifactResolver::new(&tmp, base);
            let path = resolver.resolve("/docs/search/idx.json").unwrap().unwrap();
            assert_eq!(path, tmp.join("search/idx.json"), "base {base}");
        }

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_artifact_is_not_built_error() {
        let tmp = temp_dir();
        let resolver = ArtifactResolver::new(&tmp, "/");

        let err = resolver.resolve("/search/other/idx.json").unwrap().unwrap_err();
        assert!(matches!(err, SiteIndexError::ArtifactNotBuilt { .. }));
        assert!(err.to_string().contains("built at least once"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn traversal_is_rejected() {
        let resolver = ArtifactResolver::new("/dist", "/");
        let err = resolver.resolve("/../secret/idx.json").unwrap().unwrap_err();
        assert!(matches!(err, SiteIndexError::Validation { .. }));
    }
}
