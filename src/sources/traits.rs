//! Source loading abstraction

use async_trait::async_trait;

use crate::errors::SourceResult;

/// Loads the raw playlist text behind a source identifier
///
/// Implementations decide how to interpret the identifier (remote URL or
/// local path). Any failure is reported as a [`crate::errors::SourceError`]
/// so the caller can skip the source.
#[async_trait]
pub trait ContentLoader: Send + Sync {
    async fn load(&self, source: &str) -> SourceResult<String>;
}
