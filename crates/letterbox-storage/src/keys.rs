//! Shared key generation for storage backends.
//!
//! Key format: `service-{service_id}/{file_id}.pdf`.

use letterbox_core::FileId;
use uuid::Uuid;

/// Generate the storage key for an uploaded letter.
///
/// All backends must use this format for consistency.
pub fn letter_key(service_id: Uuid, file_id: FileId) -> String {
    format!("service-{}/{}.pdf", service_id, file_id)
}
