use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Characters left as-is when a tag value is percent-encoded.
const TAG_VALUE_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

pub const TAG_STATUS: &str = "status";
pub const TAG_PAGE_COUNT: &str = "page_count";
pub const TAG_FILENAME: &str = "filename";
pub const TAG_RECIPIENT: &str = "recipient";
pub const TAG_MESSAGE: &str = "message";
pub const TAG_INVALID_PAGES: &str = "invalid_pages";

pub(crate) fn encode_tag_value(value: &str) -> String {
    utf8_percent_encode(value, TAG_VALUE_ENCODE_SET).to_string()
}

pub(crate) fn decode_tag_value(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}

/// Identifier of one upload attempt.
///
/// The same value later identifies the notification created when the letter
/// is sent. Use [`FileId::notification_id`] to cross that boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(Uuid);

impl FileId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// The notification created for this upload carries the upload's id.
    pub fn notification_id(&self) -> NotificationId {
        NotificationId(self.0)
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for FileId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Identifier of a sent notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(Uuid);

impl NotificationId {
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Valid,
    Invalid,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Valid => "valid",
            ValidationStatus::Invalid => "invalid",
        }
    }
}

/// Why the template preview service refused a letter.
///
/// Unknown reasons are carried through unchanged so that a newer service can
/// introduce codes without breaking stored metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RejectionReason {
    ContentOutsidePrintableArea,
    NotA4PortraitOriented,
    TooLong,
    UnableToReadFile,
    TemplatePreviewError,
    Other(String),
}

impl RejectionReason {
    pub fn as_str(&self) -> &str {
        match self {
            RejectionReason::ContentOutsidePrintableArea => "content-outside-printable-area",
            RejectionReason::NotA4PortraitOriented => "letter-not-a4-portrait-oriented",
            RejectionReason::TooLong => "letter-too-long",
            RejectionReason::UnableToReadFile => "unable-to-read-the-file",
            RejectionReason::TemplatePreviewError => "template-preview-error",
            RejectionReason::Other(code) => code,
        }
    }
}

impl From<String> for RejectionReason {
    fn from(code: String) -> Self {
        match code.as_str() {
            "content-outside-printable-area" => RejectionReason::ContentOutsidePrintableArea,
            "letter-not-a4-portrait-oriented" => RejectionReason::NotA4PortraitOriented,
            "letter-too-long" => RejectionReason::TooLong,
            "unable-to-read-the-file" => RejectionReason::UnableToReadFile,
            "template-preview-error" => RejectionReason::TemplatePreviewError,
            _ => RejectionReason::Other(code),
        }
    }
}

impl From<&str> for RejectionReason {
    fn from(code: &str) -> Self {
        RejectionReason::from(code.to_string())
    }
}

impl From<RejectionReason> for String {
    fn from(reason: RejectionReason) -> Self {
        match reason {
            RejectionReason::Other(code) => code,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of content validation for one letter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub status: ValidationStatus,
    pub message: Option<RejectionReason>,
    /// 1-based page numbers, always within `1..=page_count`.
    pub invalid_pages: BTreeSet<u32>,
    pub page_count: u32,
}

impl ValidationOutcome {
    pub fn valid(page_count: u32) -> Self {
        Self {
            status: ValidationStatus::Valid,
            message: None,
            invalid_pages: BTreeSet::new(),
            page_count,
        }
    }

    /// Builds an invalid outcome, returning any reported pages that fall
    /// outside the document alongside it.
    pub fn invalid(
        message: RejectionReason,
        reported_pages: impl IntoIterator<Item = u32>,
        page_count: u32,
    ) -> (Self, Vec<u32>) {
        let (in_range, out_of_range): (Vec<u32>, Vec<u32>) = reported_pages
            .into_iter()
            .partition(|page| (1..=page_count).contains(page));
        let outcome = Self {
            status: ValidationStatus::Invalid,
            message: Some(message),
            invalid_pages: in_range.into_iter().collect(),
            page_count,
        };
        (outcome, out_of_range)
    }

    pub fn is_valid(&self) -> bool {
        self.status == ValidationStatus::Valid
    }

    /// Whether `page` has to be rendered with the printable-area overlay.
    pub fn needs_overlay(&self, page: u32) -> bool {
        self.message == Some(RejectionReason::ContentOutsidePrintableArea)
            && self.invalid_pages.contains(&page)
    }
}

/// Outcome metadata persisted next to an uploaded letter. Written once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LetterMetadata {
    pub file_id: FileId,
    pub filename: String,
    #[serde(flatten)]
    pub outcome: ValidationOutcome,
    /// Decoded but not normalized. Only present for valid letters.
    pub recipient: Option<String>,
}

impl LetterMetadata {
    pub fn valid(file_id: FileId, filename: String, page_count: u32, recipient: String) -> Self {
        Self {
            file_id,
            filename,
            outcome: ValidationOutcome::valid(page_count),
            recipient: Some(recipient),
        }
    }

    pub fn invalid(file_id: FileId, filename: String, outcome: ValidationOutcome) -> Self {
        Self {
            file_id,
            filename,
            outcome,
            recipient: None,
        }
    }

    pub fn status(&self) -> ValidationStatus {
        self.outcome.status
    }

    pub fn is_valid(&self) -> bool {
        self.outcome.is_valid()
    }

    /// Encode as object tags. Text values are percent-encoded so they survive
    /// backends that only accept ASCII metadata.
    pub fn to_tags(&self) -> BTreeMap<String, String> {
        let mut tags = BTreeMap::new();
        tags.insert(TAG_STATUS.to_string(), self.outcome.status.as_str().to_string());
        tags.insert(TAG_PAGE_COUNT.to_string(), self.outcome.page_count.to_string());
        tags.insert(TAG_FILENAME.to_string(), encode_tag_value(&self.filename));

        match self.outcome.status {
            ValidationStatus::Valid => {
                if let Some(recipient) = &self.recipient {
                    tags.insert(TAG_RECIPIENT.to_string(), encode_tag_value(recipient));
                }
            }
            ValidationStatus::Invalid => {
                if let Some(message) = &self.outcome.message {
                    tags.insert(TAG_MESSAGE.to_string(), message.to_string());
                }
                let pages: Vec<String> = self
                    .outcome
                    .invalid_pages
                    .iter()
                    .map(|p| p.to_string())
                    .collect();
                tags.insert(
                    TAG_INVALID_PAGES.to_string(),
                    format!("[{}]", pages.join(", ")),
                );
            }
        }

        tags
    }

    /// Decode from object tags. A missing or unrecognised status decodes as
    /// invalid.
    pub fn from_tags(file_id: FileId, tags: &BTreeMap<String, String>) -> Result<Self, AppError> {
        let corrupt = |what: &str| {
            AppError::Storage(format!("Corrupt metadata for letter {}: {}", file_id, what))
        };

        let status = match tags.get(TAG_STATUS).map(String::as_str) {
            Some("valid") => ValidationStatus::Valid,
            _ => ValidationStatus::Invalid,
        };
        let page_count = tags
            .get(TAG_PAGE_COUNT)
            .ok_or_else(|| corrupt("missing page_count"))?
            .parse::<u32>()
            .map_err(|_| corrupt("page_count is not a number"))?;
        let filename = tags
            .get(TAG_FILENAME)
            .map(|f| decode_tag_value(f))
            .unwrap_or_default();

        match status {
            ValidationStatus::Valid => {
                let recipient = tags.get(TAG_RECIPIENT).map(|r| decode_tag_value(r));
                Ok(Self {
                    file_id,
                    filename,
                    outcome: ValidationOutcome::valid(page_count),
                    recipient,
                })
            }
            ValidationStatus::Invalid => {
                let reported: Vec<u32> = match tags.get(TAG_INVALID_PAGES) {
                    Some(raw) => serde_json::from_str(raw)
                        .map_err(|_| corrupt("invalid_pages is not a list of pages"))?,
                    None => Vec::new(),
                };
                let message = tags
                    .get(TAG_MESSAGE)
                    .map(|m| RejectionReason::from(m.as_str()));
                let invalid_pages = reported
                    .into_iter()
                    .filter(|page| (1..=page_count).contains(page))
                    .collect();
                Ok(Self::invalid(
                    file_id,
                    filename,
                    ValidationOutcome {
                        status,
                        message,
                        invalid_pages,
                        page_count,
                    },
                ))
            }
        }
    }
}

/// Postal class for a letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostageOption {
    First,
    #[default]
    Second,
}

impl PostageOption {
    pub const ALL: [PostageOption; 2] = [PostageOption::First, PostageOption::Second];

    pub fn as_str(&self) -> &'static str {
        match self {
            PostageOption::First => "first",
            PostageOption::Second => "second",
        }
    }
}

impl FromStr for PostageOption {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(PostageOption::First),
            "second" => Ok(PostageOption::Second),
            other => Err(AppError::BadRequest(format!("Unknown postage: {}", other))),
        }
    }
}

impl fmt::Display for PostageOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file as received from the submission form. Lives for one request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    /// Size the client declared for the part, if it differs from the body.
    pub declared_size: usize,
    pub content: Bytes,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, content: impl Into<Bytes>) -> Self {
        let content = content.into();
        Self {
            filename: filename.into(),
            declared_size: content.len(),
            content,
        }
    }
}

/// Everything the notification API needs to send a precompiled letter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendRequest {
    pub service_id: Uuid,
    pub filename: String,
    pub file_id: FileId,
    pub postage: PostageOption,
    pub recipient: String,
}
