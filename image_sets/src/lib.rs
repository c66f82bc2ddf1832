//! # Image Sets
//!
//! Named photo sets on disk, optionally sealed under a password, with the
//! manifests a viewer needs to enumerate and decrypt them.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        SET STORE                          │
//! │        add / remove / list / refresh / export             │
//! │  ┌──────────────┐  ┌──────────────┐  ┌─────────────────┐  │
//! │  │ SET ENCODER  │  │ SET MANIFEST │  │    CATALOG      │  │
//! │  │ salt + key   │  │ manifest.json│  │ root manifest   │  │
//! │  │ i.enc blobs  │  │ images.json  │  │ + defaultSet    │  │
//! │  └──────┬───────┘  └──────────────┘  └─────────────────┘  │
//! │  ┌──────┴──────────────────────────────────────────────┐  │
//! │  │   CRYPTO: PBKDF2-HMAC-SHA256 → AES-256-GCM          │  │
//! │  └─────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## On-disk layout
//!
//! ```text
//! images/
//!   manifest.json        catalog: {sets: [...], defaultSet}
//!   cats/                plain set
//!     a.jpg b.jpg
//!     images.json        ["a.jpg", "b.jpg"]
//!   yz/                  encrypted set
//!     0.enc 1.enc        nonce || ciphertext+tag
//!     manifest.json      {encrypted, name, salt, iv, images}
//! ```
//!
//! ## Security Model
//!
//! - One random 16-byte salt per encrypted set, 100 000 PBKDF2 rounds
//! - A fresh random 12-byte nonce for every sealed blob
//! - Filenames are sealed too; only the display name is in the clear
//! - Keys are wiped from memory on drop

pub mod config;
pub mod crypto;
pub mod encoder;
pub mod manifest;
pub mod catalog;
pub mod prompt;
pub mod secure_fs;
pub mod store;
pub mod error;

pub use config::{ExtensionAllowList, StoreConfig};
pub use error::{ImageSetError, ImageSetResult};
pub use catalog::{Catalog, CatalogEntry};
pub use manifest::{EncryptedManifest, EncryptedSet};
pub use prompt::{FixedPassword, PasswordPrompt, TerminalPrompt};
pub use store::{encrypt_folder, AddedSet, CatalogStatus, Protection, SetStore, SetSummary};

/// Image Sets version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
