//! The letter upload state machine and the views it produces.

pub mod service;
pub mod types;

pub use service::{LetterUploadService, UploadGateways};
pub use types::{
    LetterPreview, PostageSelector, SendControl, SendForm, SentLetter, SubmittedSendForm,
    UploadOutcome, UploadRejection, CANNOT_SEND_HEADLINE, SEND_BUTTON_LABEL,
};
