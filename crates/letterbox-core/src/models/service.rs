use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::letter::PostageOption;

/// Features a service may have switched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Letter,
    UploadLetters,
    Email,
    Sms,
}

impl Capability {
    /// Parse a permission name as reported by the service directory. Names
    /// this crate does not model return `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "letter" => Some(Capability::Letter),
            "upload_letters" => Some(Capability::UploadLetters),
            "email" => Some(Capability::Email),
            "sms" => Some(Capability::Sms),
            _ => None,
        }
    }
}

/// The service on whose behalf a request is made.
///
/// Resolved once per request and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceContext {
    pub service_id: Uuid,
    /// Trial-mode services cannot send real letters.
    pub restricted: bool,
    pub capabilities: BTreeSet<Capability>,
}

impl ServiceContext {
    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Both `letter` and `upload_letters` are switched on.
    pub fn can_upload_letters(&self) -> bool {
        self.has_capability(Capability::Letter) && self.has_capability(Capability::UploadLetters)
    }

    /// Grants permission to dispatch letters for this service.
    ///
    /// Capabilities are checked first, then trial mode. Both denials are
    /// `Forbidden` and carry the reason only for logging.
    pub fn send_permit(&self) -> Result<SendPermit, AppError> {
        if !self.can_upload_letters() {
            return Err(AppError::Forbidden(format!(
                "service {} lacks letter or upload_letters",
                self.service_id
            )));
        }
        if self.restricted {
            return Err(AppError::Forbidden(format!(
                "service {} is restricted",
                self.service_id
            )));
        }
        Ok(SendPermit::new(self.service_id))
    }
}

/// Proof that a service passed the send checks.
///
/// Only [`ServiceContext::send_permit`] can construct one, so a dispatcher
/// that demands a permit cannot be reached for a trial-mode service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendPermit {
    service_id: Uuid,
    _private: (),
}

impl SendPermit {
    pub(crate) fn new(service_id: Uuid) -> Self {
        Self {
            service_id,
            _private: (),
        }
    }

    pub fn service_id(&self) -> Uuid {
        self.service_id
    }
}

/// The precompiled-letter template of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecompiledTemplate {
    pub id: Uuid,
    pub postage: Option<PostageOption>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(restricted: bool, capabilities: &[Capability]) -> ServiceContext {
        ServiceContext {
            service_id: Uuid::new_v4(),
            restricted,
            capabilities: capabilities.iter().copied().collect(),
        }
    }

    #[test]
    fn test_send_permit_granted() {
        let ctx = context(false, &[Capability::Letter, Capability::UploadLetters]);
        let permit = ctx.send_permit().unwrap();
        assert_eq!(permit.service_id(), ctx.service_id);
    }

    #[test]
    fn test_send_permit_requires_both_capabilities() {
        for caps in [
            vec![Capability::Letter],
            vec![Capability::UploadLetters],
            vec![Capability::Email, Capability::Sms],
        ] {
            let err = context(false, &caps).send_permit().unwrap_err();
            assert!(matches!(err, AppError::Forbidden(_)));
        }
    }

    #[test]
    fn test_send_permit_denied_for_restricted_service() {
        let ctx = context(true, &[Capability::Letter, Capability::UploadLetters]);
        assert!(ctx.can_upload_letters());
        match ctx.send_permit() {
            Err(AppError::Forbidden(reason)) => assert!(reason.contains("restricted")),
            other => panic!("expected Forbidden, got {:?}", other),
        }
    }

    #[test]
    fn test_capability_serde_names() {
        let json = serde_json::to_string(&Capability::UploadLetters).unwrap();
        assert_eq!(json, "\"upload_letters\"");
        assert_eq!(
            Capability::from_name("upload_letters"),
            Some(Capability::UploadLetters)
        );
        assert_eq!(Capability::from_name("international_letters"), None);
    }
}
