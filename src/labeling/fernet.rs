//! Fernet-compatible authenticated tokens
//!
//! Token layout (before URL-safe base64):
//! `0x80 | timestamp (u64 BE) | IV (16) | AES-128-CBC/PKCS7 ciphertext | HMAC-SHA256 (32)`.
//! The MAC covers every byte before it and is checked in constant time
//! before any decryption happens. Tokens interoperate with other Fernet
//! implementations that hold the same 32-byte key.

use aes::Aes128;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;
type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

const VERSION: u8 = 0x80;
const TIMESTAMP_LEN: usize = 8;
const IV_LEN: usize = 16;
const HEADER_LEN: usize = 1 + TIMESTAMP_LEN + IV_LEN;
const BLOCK_LEN: usize = 16;
const MAC_LEN: usize = 32;
const SYNTHETIC_IV_DOMAIN: &[u8] = b"iv:";

/// Fernet cipher bound to one 32-byte key
#[derive(Clone)]
pub struct Fernet {
    signing_mac: HmacSha256,
    encryption_key: [u8; 16],
}

impl Fernet {
    /// Split a 32-byte Fernet key into its signing and encryption halves
    pub fn new(key: &[u8; 32]) -> Option<Self> {
        let (signing_key, encryption_key) = key.split_at(16);
        let signing_mac = HmacSha256::new_from_slice(signing_key).ok()?;
        let encryption_key: [u8; 16] = encryption_key.try_into().ok()?;
        Some(Self {
            signing_mac,
            encryption_key,
        })
    }

    /// Encrypt with a synthetic IV and a zero timestamp
    ///
    /// The same plaintext under the same key always yields the same token.
    pub fn encrypt_deterministic(&self, plaintext: &[u8]) -> String {
        let iv = self.synthetic_iv(plaintext);
        self.encrypt_with_iv(plaintext, 0, iv)
    }

    /// Encrypt with an explicit timestamp and IV
    pub fn encrypt_with_iv(&self, plaintext: &[u8], timestamp: u64, iv: [u8; IV_LEN]) -> String {
        let ciphertext = Aes128CbcEnc::new(&self.encryption_key.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let mut token = Vec::with_capacity(HEADER_LEN + ciphertext.len() + MAC_LEN);
        token.push(VERSION);
        token.extend_from_slice(&timestamp.to_be_bytes());
        token.extend_from_slice(&iv);
        token.extend_from_slice(&ciphertext);

        let mut mac = self.signing_mac.clone();
        mac.update(&token);
        token.extend_from_slice(&mac.finalize().into_bytes());

        URL_SAFE.encode(token)
    }

    /// Verify and decrypt a token; `None` on any failure
    ///
    /// Wrong keys, truncated or tampered tokens and bad padding are all
    /// indistinguishable to the caller.
    pub fn decrypt(&self, token: &str) -> Option<Vec<u8>> {
        let data = URL_SAFE.decode(token.trim()).ok()?;
        if data.len() < HEADER_LEN + BLOCK_LEN + MAC_LEN || data[0] != VERSION {
            return None;
        }

        let (signed, tag) = data.split_at(data.len() - MAC_LEN);
        let mut mac = self.signing_mac.clone();
        mac.update(signed);
        mac.verify_slice(tag).ok()?;

        let iv: [u8; IV_LEN] = signed[1 + TIMESTAMP_LEN..HEADER_LEN].try_into().ok()?;
        let ciphertext = &signed[HEADER_LEN..];
        if ciphertext.len() % BLOCK_LEN != 0 {
            return None;
        }

        Aes128CbcDec::new(&self.encryption_key.into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .ok()
    }

    fn synthetic_iv(&self, plaintext: &[u8]) -> [u8; IV_LEN] {
        let mut mac = self.signing_mac.clone();
        mac.update(SYNTHETIC_IV_DOMAIN);
        mac.update(plaintext);
        let digest = mac.finalize().into_bytes();

        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&digest[..IV_LEN]);
        iv
    }
}
