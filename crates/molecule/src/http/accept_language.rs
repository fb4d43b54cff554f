use crate::http::header::Header;
use std::fmt;

/// A language tag reduced to its language and optional region, such as `en` or `fr-CA`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locale {
    language: String,
    region: Option<String>,
}

impl Locale {
    pub fn new<S: Into<String>>(language: S, region: Option<String>) -> Self {
        Self { language: language.into().to_ascii_lowercase(), region: region.map(|r| r.to_ascii_uppercase()) }
    }

    /// Parses a language tag, ignoring script and variant subtags.
    pub fn from_language_tag(tag: &str) -> Self {
        let mut subtags = tag.split(['-', '_']).filter(|s| !s.is_empty());
        let language = subtags.next().unwrap_or_default();
        let region = subtags.find(|s| s.len() == 2 || (s.len() == 3 && s.chars().all(|c| c.is_ascii_digit())));
        Self::new(language, region.map(str::to_string))
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// The same locale without its region.
    pub fn language_only(&self) -> Locale {
        Locale::new(self.language.clone(), None)
    }

    pub fn to_language_tag(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.region {
            Some(region) => write!(f, "{}-{}", self.language, region),
            None => f.write_str(&self.language),
        }
    }
}

/// The locales accepted by a client, in order of preference, from `Accept-Language`.
#[derive(Debug, Clone, Default)]
pub struct AcceptLanguage {
    locales: Vec<Locale>,
}

impl AcceptLanguage {
    pub fn parse(header: &str) -> Self {
        Self::from(Header::parse(header))
    }

    pub fn list(&self) -> &[Locale] {
        &self.locales
    }

    /// Selects the best locale among `candidates`.
    ///
    /// For each accepted locale in preference order: an exact candidate wins, then a candidate
    /// for the bare language, then any candidate sharing the language.
    pub fn select_best(&self, candidates: &[Locale]) -> Option<Locale> {
        for accepted in &self.locales {
            if candidates.contains(accepted) {
                return Some(accepted.clone());
            }
            let language = accepted.language_only();
            if candidates.contains(&language) {
                return Some(language);
            }
            if let Some(candidate) = candidates.iter().find(|c| c.language() == accepted.language()) {
                return Some(candidate.clone());
            }
        }
        None
    }
}

impl From<Header> for AcceptLanguage {
    fn from(header: Header) -> Self {
        let locales =
            header.values().into_iter().filter(|tag| !tag.is_empty() && *tag != "*").map(Locale::from_language_tag).collect();
        Self { locales }
    }
}
