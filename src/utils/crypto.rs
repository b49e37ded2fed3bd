//! Digest helpers used to name compiled artifacts
//!
//! Compiled templates are stored under a name derived from the source path,
//! so the digest only has to be deterministic and collision resistant for
//! file paths. MD5 and SHA1 are kept for compatibility with existing caches.

use crate::error::Error;
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::str::FromStr;

/// Digest algorithm used for compiled artifact names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Md5,
    #[default]
    Sha1,
    Sha256,
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "md5" => Ok(HashAlgorithm::Md5),
            "sha1" => Ok(HashAlgorithm::Sha1),
            "sha256" => Ok(HashAlgorithm::Sha256),
            _ => Err(Error::config(format!("Unknown hash algorithm '{}'", s))),
        }
    }
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
        }
    }
}

/// Hex digest of `input` with the given algorithm
///
/// # Example
/// ```rust,ignore
/// let name = hash_hex(HashAlgorithm::Sha1, "views/home.blade.php");
/// assert_eq!(name.len(), 40);
/// ```
pub fn hash_hex(algorithm: HashAlgorithm, input: &str) -> String {
    match algorithm {
        HashAlgorithm::Md5 => format!("{:x}", Md5::digest(input.as_bytes())),
        HashAlgorithm::Sha1 => format!("{:x}", Sha1::digest(input.as_bytes())),
        HashAlgorithm::Sha256 => format!("{:x}", Sha256::digest(input.as_bytes())),
    }
}
