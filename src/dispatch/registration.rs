use bitflags::bitflags;
use serde::de::{self, Deserializer};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::model::limits;

bitflags! {
    /// Content types this app declares it can receive from the host
    ///
    /// Serialized as a list of lowercase flag names, e.g. `["text", "pdf"]`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SupportedContent: u64 {
        const TEXT = 1 << 0;
        const PICTURE = 1 << 1;
        const LOCATION = 1 << 2;
        const VIDEO = 1 << 3;
        const AUDIO = 1 << 4;
        const WEBPAGE = 1 << 5;
        const DOC = 1 << 6;
        const DOCX = 1 << 7;
        const PPT = 1 << 8;
        const PPTX = 1 << 9;
        const XLS = 1 << 10;
        const XLSX = 1 << 11;
        const PDF = 1 << 12;
    }
}

impl SupportedContent {
    /// Parse one lowercase content name as used in config files
    pub fn parse_name(name: &str) -> Option<Self> {
        if name.bytes().any(|b| b.is_ascii_uppercase()) {
            return None;
        }
        Self::from_name(&name.to_ascii_uppercase())
    }

    /// Lowercase names of the flags that are set
    pub fn names(&self) -> impl Iterator<Item = String> + '_ {
        self.iter_names().map(|(name, _)| name.to_ascii_lowercase())
    }
}

impl Serialize for SupportedContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(None)?;
        for name in self.names() {
            seq.serialize_element(&name)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for SupportedContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        names.iter().try_fold(Self::empty(), |acc, name| {
            Self::parse_name(name)
                .map(|flag| acc | flag)
                .ok_or_else(|| de::Error::custom(format!("unknown content type {name:?}")))
        })
    }
}

/// One-time declaration handed to the launcher at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    app_id: String,
    universal_link: Option<String>,
    supported_content: SupportedContent,
}

impl Registration {
    pub fn new(
        app_id: impl Into<String>,
        supported_content: SupportedContent,
    ) -> Result<Self, ValidationError> {
        let app_id = app_id.into();
        limits::required("app_id", &app_id, limits::IDENTIFIER)?;
        Ok(Self {
            app_id,
            universal_link: None,
            supported_content,
        })
    }

    /// Attach the link the host uses to return control to this app
    pub fn with_universal_link(
        mut self,
        link: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let link = link.into();
        limits::required("universal_link", &link, limits::URL)?;
        self.universal_link = Some(link);
        Ok(self)
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn universal_link(&self) -> Option<&str> {
        self.universal_link.as_deref()
    }

    pub fn supported_content(&self) -> SupportedContent {
        self.supported_content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_values() {
        assert_eq!(SupportedContent::TEXT.bits(), 0x1);
        assert_eq!(SupportedContent::PDF.bits(), 0x1000);
        assert_eq!(SupportedContent::all().bits(), 0x1fff);
        assert!(SupportedContent::default().is_empty());
    }

    #[test]
    fn test_names_in_config_form() {
        let content = SupportedContent::TEXT | SupportedContent::PDF;
        assert_eq!(content.names().collect::<Vec<_>>(), vec!["text", "pdf"]);
        assert_eq!(SupportedContent::parse_name("docx"), Some(SupportedContent::DOCX));
        assert_eq!(SupportedContent::parse_name("DOCX"), None);
        assert_eq!(SupportedContent::parse_name("gif"), None);
    }

    #[test]
    fn test_serde_as_names() {
        let content = SupportedContent::PICTURE | SupportedContent::XLSX;
        let json = serde_json::to_string(&content).unwrap();
        assert_eq!(json, r#"["picture","xlsx"]"#);
        let back: SupportedContent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, content);
        assert!(serde_json::from_str::<SupportedContent>(r#"["gif"]"#).is_err());
    }

    #[test]
    fn test_registration_requires_app_id() {
        assert!(Registration::new("", SupportedContent::all()).is_err());
        let registration = Registration::new("wx123", SupportedContent::TEXT)
            .unwrap()
            .with_universal_link("https://example.com/app/")
            .unwrap();
        assert_eq!(registration.universal_link(), Some("https://example.com/app/"));
    }
}
