use letterbox_core::{
    AppError, FileId, LetterMetadata, NotificationId, PostageOption, RejectionReason,
    ValidationStatus,
};
use serde::{Deserialize, Serialize};

pub const CANNOT_SEND_HEADLINE: &str = "You cannot send this letter";
pub const SEND_BUTTON_LABEL: &str = "Send 1 letter";

/// Why an upload was turned away before anything was persisted.
///
/// These are expected outcomes and are rendered back on the upload form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadRejection {
    NoFileChosen,
    WrongType,
    TooBig { max_size_mb: usize },
    Malformed,
    VirusFound,
}

impl UploadRejection {
    /// Status the re-rendered form is served with.
    pub fn status_code(&self) -> u16 {
        match self {
            UploadRejection::NoFileChosen | UploadRejection::WrongType => 200,
            UploadRejection::TooBig { .. }
            | UploadRejection::Malformed
            | UploadRejection::VirusFound => 400,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            UploadRejection::NoFileChosen => "no-file-chosen",
            UploadRejection::WrongType => "wrong-file-type",
            UploadRejection::TooBig { .. } => "file-too-big",
            UploadRejection::Malformed => "malformed-pdf",
            UploadRejection::VirusFound => "virus-found",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            UploadRejection::NoFileChosen => "You need to choose a file to upload",
            UploadRejection::WrongType => "Wrong file type",
            UploadRejection::TooBig { .. } => "Your file is too big",
            UploadRejection::Malformed => "There’s a problem with your file",
            UploadRejection::VirusFound => "Your file contains a virus",
        }
    }

    pub fn detail(&self) -> Option<String> {
        match self {
            UploadRejection::WrongType => Some("Save your letter as a PDF and try again.".into()),
            UploadRejection::TooBig { max_size_mb } => {
                Some(format!("Files must be smaller than {}MB.", max_size_mb))
            }
            UploadRejection::Malformed => Some(
                "Notify cannot read this PDF. Save a new copy of your file and try again.".into(),
            ),
            UploadRejection::NoFileChosen | UploadRejection::VirusFound => None,
        }
    }
}

/// Result of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Rejected(UploadRejection),
    /// The letter was persisted, valid or not. `redirect` points at its preview.
    Stored {
        file_id: FileId,
        metadata: LetterMetadata,
        redirect: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostageSelector {
    pub options: Vec<PostageOption>,
    pub selected: PostageOption,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendControl {
    pub file_id: FileId,
    pub filename: String,
    pub label: &'static str,
}

/// Everything the preview page shows for one uploaded letter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LetterPreview {
    pub headline: String,
    pub file_id: FileId,
    pub filename: String,
    pub status: ValidationStatus,
    pub message: Option<RejectionReason>,
    pub invalid_pages: Vec<u32>,
    pub page_count: u32,
    /// One URL per page, fetched lazily by the client.
    pub page_images: Vec<String>,
    /// Normalized. Valid letters only.
    pub recipient: Option<String>,
    pub postage: Option<PostageSelector>,
    pub send_control: Option<SendControl>,
    pub back_link: Option<String>,
}

/// The send form as posted from the preview page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SendForm {
    pub file_id: FileId,
    pub filename: String,
    #[serde(default)]
    pub postage: Option<PostageOption>,
}

/// The send form exactly as submitted, before any field is interpreted.
///
/// Every field is optional text so that a malformed body still reaches the
/// permission check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SubmittedSendForm {
    #[serde(default)]
    pub file_id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub postage: Option<String>,
}

impl SubmittedSendForm {
    /// Interpret the fields. An empty `postage` counts as absent.
    pub fn parse(self) -> Result<SendForm, AppError> {
        let file_id = self
            .file_id
            .trim()
            .parse::<FileId>()
            .map_err(|_| AppError::BadRequest(format!("Invalid file_id: {:?}", self.file_id)))?;
        let postage = match self.postage.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<PostageOption>()?),
        };
        Ok(SendForm {
            file_id,
            filename: self.filename,
            postage,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentLetter {
    pub notification_id: NotificationId,
    pub redirect: String,
}

pub fn upload_form_path(service_id: uuid::Uuid) -> String {
    format!("/services/{}/upload-letter", service_id)
}

pub fn preview_path(service_id: uuid::Uuid, file_id: FileId) -> String {
    format!("/services/{}/preview-letter/{}", service_id, file_id)
}

pub fn preview_image_path(service_id: uuid::Uuid, file_id: FileId, page: u32) -> String {
    format!(
        "/services/{}/preview-letter-image/{}?page={}",
        service_id, file_id, page
    )
}

pub fn notification_path(service_id: uuid::Uuid, notification_id: NotificationId) -> String {
    format!("/services/{}/notification/{}", service_id, notification_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_status_codes() {
        assert_eq!(UploadRejection::NoFileChosen.status_code(), 200);
        assert_eq!(UploadRejection::WrongType.status_code(), 200);
        assert_eq!(UploadRejection::TooBig { max_size_mb: 2 }.status_code(), 400);
        assert_eq!(UploadRejection::Malformed.status_code(), 400);
        assert_eq!(UploadRejection::VirusFound.status_code(), 400);
    }

    #[test]
    fn test_rejection_messages() {
        assert_eq!(
            UploadRejection::TooBig { max_size_mb: 2 }.detail().as_deref(),
            Some("Files must be smaller than 2MB.")
        );
        assert_eq!(UploadRejection::VirusFound.title(), "Your file contains a virus");
        assert_eq!(UploadRejection::VirusFound.detail(), None);
        assert_eq!(UploadRejection::NoFileChosen.detail(), None);
    }

    #[test]
    fn test_send_form_postage_is_optional() {
        let form: SendForm = serde_json::from_str(
            r#"{"file_id": "a1b2c3d4-0000-4000-8000-000000000001", "filename": "my_file.pdf"}"#,
        )
        .unwrap();
        assert_eq!(form.postage, None);
    }

    #[test]
    fn test_submitted_send_form_parse() {
        let form = SubmittedSendForm {
            file_id: "a1b2c3d4-0000-4000-8000-000000000001".to_string(),
            filename: "my_file.pdf".to_string(),
            postage: Some("first".to_string()),
        }
        .parse()
        .unwrap();
        assert_eq!(form.file_id.to_string(), "a1b2c3d4-0000-4000-8000-000000000001");
        assert_eq!(form.postage, Some(PostageOption::First));

        let form = SubmittedSendForm {
            file_id: "a1b2c3d4-0000-4000-8000-000000000001".to_string(),
            postage: Some(String::new()),
            ..SubmittedSendForm::default()
        }
        .parse()
        .unwrap();
        assert_eq!(form.postage, None);
    }

    #[test]
    fn test_submitted_send_form_rejects_bad_fields() {
        let bad_id = SubmittedSendForm {
            file_id: "abcd-1234".to_string(),
            ..SubmittedSendForm::default()
        };
        assert!(matches!(bad_id.parse(), Err(AppError::BadRequest(_))));

        let bad_postage = SubmittedSendForm {
            file_id: "a1b2c3d4-0000-4000-8000-000000000001".to_string(),
            postage: Some("third".to_string()),
            ..SubmittedSendForm::default()
        };
        assert!(matches!(bad_postage.parse(), Err(AppError::BadRequest(_))));
    }
}
