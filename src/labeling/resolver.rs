//! Label resolution
//!
//! Maps labels found in a written playlist back to their sources.
//! Reversible labels are decrypted. Deterministic labels are matched by
//! recomputing the digest for every known source, so resolving one costs
//! O(known sources) HMAC computations.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use hmac::Mac;
use tracing::debug;

use super::{SourceKey, SourceLabel, DIGEST_HEX_LEN};
use crate::errors::AppResult;
use crate::models::normalize_source;
use crate::playlist::generator::SOURCE_COMMENT_PREFIX;

/// Resolve a label to its source
///
/// Returns `None` for a wrong key, a tampered token, a malformed digest or a
/// digest that matches none of `known_sources`.
pub fn resolve_label(
    label: &SourceLabel,
    key: &SourceKey,
    known_sources: &[String],
) -> Option<String> {
    match label {
        SourceLabel::Reversible(token) => decrypt_reversible(token, key),
        SourceLabel::Deterministic(digest) => match_deterministic(digest, key, known_sources),
    }
}

fn decrypt_reversible(token: &str, key: &SourceKey) -> Option<String> {
    let plaintext = key.fernet().decrypt(token)?;
    String::from_utf8(plaintext).ok()
}

fn match_deterministic(digest: &str, key: &SourceKey, known_sources: &[String]) -> Option<String> {
    if digest.len() != DIGEST_HEX_LEN {
        return None;
    }
    let expected = hex::decode(digest).ok()?;

    known_sources.iter().map(|s| normalize_source(s)).find(|source| {
        let mut mac = key.label_mac();
        mac.update(source.as_bytes());
        // constant-time comparison of the truncated tag
        mac.verify_truncated_left(&expected).is_ok()
    })
}

/// One distinct label found in a playlist and what it resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLabel {
    pub label: String,
    pub source: Option<String>,
}

impl fmt::Display for DecodedLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{} => {}", self.label, source),
            None => write!(f, "{} => [unresolved]", self.label),
        }
    }
}

/// Distinct `SRC-` labels from the source comment lines of a playlist, in
/// order of first appearance
pub fn extract_source_labels(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    content
        .lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix(SOURCE_COMMENT_PREFIX))
        .map(str::trim)
        .filter(|label| label.starts_with("SRC-"))
        .filter(|label| seen.insert(label.to_string()))
        .map(str::to_string)
        .collect()
}

/// Resolve every distinct label in playlist text
pub fn decode_playlist_labels(
    content: &str,
    key: &SourceKey,
    known_sources: &[String],
) -> Vec<DecodedLabel> {
    extract_source_labels(content)
        .into_iter()
        .map(|label| {
            let source = SourceLabel::parse(&label)
                .and_then(|parsed| resolve_label(&parsed, key, known_sources));
            debug!("Label {} resolved: {}", label, source.is_some());
            DecodedLabel { label, source }
        })
        .collect()
}

/// Read a written playlist and resolve every distinct label in it
pub async fn decode_labels_from_file(
    path: impl AsRef<Path>,
    key: &SourceKey,
    known_sources: &[String],
) -> AppResult<Vec<DecodedLabel>> {
    let content = tokio::fs::read_to_string(path.as_ref()).await?;
    Ok(decode_playlist_labels(&content, key, known_sources))
}
