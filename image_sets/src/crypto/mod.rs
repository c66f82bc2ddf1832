//! Image Sets - Cryptographic Core
//!
//! Password-derived AES-256-GCM, shared by every command that seals or opens a set.

pub mod keys;
pub mod aead;

pub use keys::*;
pub use aead::*;
