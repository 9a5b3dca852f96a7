//! Source labelling
//!
//! Every output channel carries a label naming its source without exposing
//! the source location. Two schemes share the `SRC-` tagged string format:
//!
//! - `SRC-ID:<24 hex>`: truncated HMAC-SHA256 of the source. Stable and
//!   irreversible; it can only be matched against a list of known sources.
//! - `SRC-ENC:<token>`: Fernet token of the source. Decryptable with the key.
//!
//! Both are keyed by a [`SourceKey`] derived from the run passphrase.

pub mod fernet;
pub mod resolver;

use std::fmt;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use strum::{Display, EnumString};

use crate::models::normalize_source;
use fernet::Fernet;

pub use resolver::{decode_labels_from_file, decode_playlist_labels, resolve_label, DecodedLabel};

type HmacSha256 = Hmac<Sha256>;

pub const DETERMINISTIC_PREFIX: &str = "SRC-ID:";
pub const REVERSIBLE_PREFIX: &str = "SRC-ENC:";
/// Hex characters of the HMAC digest kept in a deterministic label
pub const DIGEST_HEX_LEN: usize = 24;

/// Label scheme used when writing a playlist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LabelMode {
    #[default]
    Deterministic,
    Reversible,
}

/// Secret key material derived from the run passphrase
///
/// The passphrase is hashed with SHA-256 and the digest is URL-safe base64
/// encoded. The encoded string keys the deterministic HMAC; the raw digest
/// is the Fernet key for reversible labels. The passphrase itself is never
/// kept.
#[derive(Clone)]
pub struct SourceKey {
    label_mac: HmacSha256,
    fernet: Fernet,
}

impl SourceKey {
    /// Derive a key from a passphrase; `None` when the passphrase is blank
    pub fn from_passphrase(passphrase: &str) -> Option<Self> {
        let passphrase = passphrase.trim();
        if passphrase.is_empty() {
            return None;
        }

        let digest: [u8; 32] = Sha256::digest(passphrase.as_bytes()).into();
        let encoded = URL_SAFE.encode(digest);

        Some(Self {
            label_mac: HmacSha256::new_from_slice(encoded.as_bytes()).ok()?,
            fernet: Fernet::new(&digest)?,
        })
    }

    /// Fresh HMAC instance keyed for deterministic labels
    pub(crate) fn label_mac(&self) -> HmacSha256 {
        self.label_mac.clone()
    }

    pub(crate) fn fernet(&self) -> &Fernet {
        &self.fernet
    }
}

impl fmt::Debug for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SourceKey(<redacted>)")
    }
}

/// A parsed source label
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceLabel {
    /// Truncated hex digest (without prefix)
    Deterministic(String),
    /// Fernet token (without prefix)
    Reversible(String),
}

impl SourceLabel {
    /// Parse a `SRC-ID:` / `SRC-ENC:` string. Unknown prefixes and empty
    /// payloads yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (payload, ctor): (&str, fn(String) -> Self) =
            if let Some(digest) = raw.strip_prefix(DETERMINISTIC_PREFIX) {
                (digest, Self::Deterministic)
            } else if let Some(token) = raw.strip_prefix(REVERSIBLE_PREFIX) {
                (token, Self::Reversible)
            } else {
                return None;
            };

        let payload = payload.trim();
        if payload.is_empty() {
            return None;
        }
        Some(ctor(payload.to_string()))
    }

    pub fn mode(&self) -> LabelMode {
        match self {
            Self::Deterministic(_) => LabelMode::Deterministic,
            Self::Reversible(_) => LabelMode::Reversible,
        }
    }
}

impl fmt::Display for SourceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deterministic(digest) => write!(f, "{DETERMINISTIC_PREFIX}{digest}"),
            Self::Reversible(token) => write!(f, "{REVERSIBLE_PREFIX}{token}"),
        }
    }
}

/// Computes labels for sources under one key and mode
#[derive(Debug, Clone)]
pub struct SourceLabeler {
    key: SourceKey,
    mode: LabelMode,
}

impl SourceLabeler {
    pub fn new(key: SourceKey, mode: LabelMode) -> Self {
        Self { key, mode }
    }

    /// Label a source with the configured scheme
    pub fn label(&self, source: &str) -> SourceLabel {
        match self.mode {
            LabelMode::Deterministic => self.deterministic(source),
            LabelMode::Reversible => self.reversible(source),
        }
    }

    /// `SRC-ID:` label for a source, regardless of the configured mode
    pub fn deterministic(&self, source: &str) -> SourceLabel {
        SourceLabel::Deterministic(deterministic_digest(&self.key, source))
    }

    /// `SRC-ENC:` label for a source, regardless of the configured mode
    pub fn reversible(&self, source: &str) -> SourceLabel {
        let source = normalize_source(source);
        SourceLabel::Reversible(self.key.fernet().encrypt_deterministic(source.as_bytes()))
    }
}

/// First [`DIGEST_HEX_LEN`] hex characters of HMAC-SHA256(key, source)
pub(crate) fn deterministic_digest(key: &SourceKey, source: &str) -> String {
    let mut mac = key.label_mac();
    mac.update(normalize_source(source).as_bytes());
    let digest = hex::encode(mac.finalize().into_bytes());
    digest[..DIGEST_HEX_LEN].to_string()
}
