//! Development server for search artifacts.
//!
//! Serves `idx.json` / `docs.json` from the last build so the runtime client
//! works during development. Artifacts are never regenerated here.
//!
//! - [`resolver`]: request path to file mapping
//! - [`server`]: axum middleware, router, and standalone server

pub mod resolver;
pub mod server;

pub use resolver::ArtifactResolver;
pub use server::{artifact_middleware, router, serve};
