//! Letterbox Processing Library
//!
//! Local, network-free inspection of uploaded letters: structural validation
//! and page counting.

pub mod document;
pub mod validator;

pub use document::count_pages;
pub use validator::{LetterValidator, PdfCheckError};
