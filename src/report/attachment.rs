/// Declared MIME type of an attachment. Decides the file extension and
/// whether the payload must be text or bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentType {
    Text,
    Json,
    Html,
    Xml,
    Csv,
    Png,
    Jpeg,
}

impl AttachmentType {
    pub fn mime(self) -> &'static str {
        match self {
            AttachmentType::Text => "text/plain",
            AttachmentType::Json => "application/json",
            AttachmentType::Html => "text/html",
            AttachmentType::Xml => "application/xml",
            AttachmentType::Csv => "text/csv",
            AttachmentType::Png => "image/png",
            AttachmentType::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            AttachmentType::Text => "txt",
            AttachmentType::Json => "json",
            AttachmentType::Html => "html",
            AttachmentType::Xml => "xml",
            AttachmentType::Csv => "csv",
            AttachmentType::Png => "png",
            AttachmentType::Jpeg => "jpg",
        }
    }

    pub fn is_textual(self) -> bool {
        !matches!(self, AttachmentType::Png | AttachmentType::Jpeg)
    }
}

/// Attachment payload, written to disk immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentContent {
    Text(String),
    Binary(Vec<u8>),
}

impl AttachmentContent {
    pub fn is_text(&self) -> bool {
        matches!(self, AttachmentContent::Text(_))
    }

    pub fn describe(&self) -> &'static str {
        match self {
            AttachmentContent::Text(_) => "text",
            AttachmentContent::Binary(_) => "binary",
        }
    }
}

impl From<&str> for AttachmentContent {
    fn from(s: &str) -> Self {
        AttachmentContent::Text(s.to_string())
    }
}

impl From<String> for AttachmentContent {
    fn from(s: String) -> Self {
        AttachmentContent::Text(s)
    }
}

impl From<Vec<u8>> for AttachmentContent {
    fn from(bytes: Vec<u8>) -> Self {
        AttachmentContent::Binary(bytes)
    }
}
