//! Utility helpers shared by the compiler and the artifact cache

pub mod crypto;

pub use crypto::{hash_hex, HashAlgorithm};
