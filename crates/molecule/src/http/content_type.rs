use crate::http::header::Header;
use std::fmt;

/// A parsed `Content-Type` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    kind: String,
    sub_type: Option<String>,
    charset: Option<String>,
}

impl ContentType {
    pub fn new<S: Into<String>>(kind: S, sub_type: Option<String>, charset: Option<String>) -> Self {
        Self { kind: kind.into(), sub_type, charset }
    }

    pub fn parse(header: &str) -> Option<Self> {
        Self::from_header(&Header::parse(header))
    }

    pub fn from_header(header: &Header) -> Option<Self> {
        let value = header.first()?;
        let mut tokens = value.value().splitn(2, '/');
        let kind = tokens.next().unwrap_or_default().to_string();
        let sub_type = tokens.next().map(str::to_string);
        Some(Self { kind, sub_type, charset: value.parameter("charset").map(|c| c.trim_matches('"').to_string()) })
    }

    pub fn media_type(&self) -> String {
        format!("{}/{}", self.kind, self.sub_type.as_deref().unwrap_or_default())
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn sub_type(&self) -> Option<&str> {
        self.sub_type.as_deref()
    }

    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    /// The typed media type, when the value is a valid mime type.
    pub fn mime(&self) -> Option<mime::Mime> {
        self.to_string().parse().ok()
    }

    #[must_use]
    pub fn with_charset<S: Into<String>>(mut self, charset: S) -> Self {
        self.charset = Some(charset.into());
        self
    }
}

impl From<&mime::Mime> for ContentType {
    fn from(media: &mime::Mime) -> Self {
        let charset = media.get_param(mime::CHARSET).map(|charset| charset.as_str().to_string());
        Self { kind: media.type_().to_string(), sub_type: Some(media.subtype().to_string()), charset }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.media_type())?;
        if let Some(charset) = &self.charset {
            write!(f, "; charset={charset}")?;
        }
        Ok(())
    }
}
