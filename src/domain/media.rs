use crate::domain::errors::{DomainError, DomainResult};

/// Image formats accepted on upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportedMediaType {
    Jpeg,
    Png,
    Webp,
}

impl SupportedMediaType {
    /// Parses a declared `Content-Type`, ignoring parameters and case.
    pub fn from_content_type(content_type: Option<&str>) -> DomainResult<Self> {
        let essence = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .ok_or(DomainError::UnsupportedMediaType)?;

        match essence.as_str() {
            "image/jpeg" => Ok(Self::Jpeg),
            "image/png" => Ok(Self::Png),
            "image/webp" => Ok(Self::Webp),
            _ => Err(DomainError::UnsupportedMediaType),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }
}
