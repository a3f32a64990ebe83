//! Letterbox Storage Library
//!
//! This crate provides storage abstraction and implementations for uploaded
//! letters. It includes the Storage trait and implementations for S3 and the
//! local filesystem.
//!
//! # Storage key format
//!
//! All backends use the same key layout: `service-{service_id}/{file_id}.pdf`.
//! Each object carries string tags holding the letter's validation outcome.
//! Objects are written once and never modified.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::letter_key;
pub use letterbox_core::StorageBackend;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult, StoredObject, Tags};
