use crate::http::header::{Header, Value};

/// The content codings accepted by a client, as listed in `Accept-Encoding`.
#[derive(Debug, Clone)]
pub struct AcceptEncoding {
    values: Vec<Value>,
}

impl AcceptEncoding {
    pub fn parse(header: &str) -> Self {
        Self::from(Header::parse(header))
    }

    /// Picks the preferred coding among the `candidates` the server can produce.
    ///
    /// `identity` is acceptable unless explicitly refused, and `*` stands for every candidate
    /// not otherwise listed. Returns `None` when nothing acceptable remains.
    pub fn select_best_encoding<'a>(&self, candidates: &[&'a str]) -> Option<&'a str> {
        let codings = self.explicit_content_codings(candidates);

        let mut acceptable: Vec<&str> = codings.iter().map(Value::value).collect();
        if !acceptable.contains(&"identity") {
            acceptable.push("identity");
        }
        for coding in codings.iter().filter(|coding| !coding.acceptable()) {
            acceptable.retain(|value| *value != coding.value());
        }

        acceptable.into_iter().find_map(|value| candidates.iter().find(|candidate| **candidate == value).copied())
    }

    fn explicit_content_codings(&self, candidates: &[&str]) -> Vec<Value> {
        let mut codings = Vec::with_capacity(self.values.len());
        for accept in &self.values {
            if accept.is("*") {
                let others = candidates.iter().filter(|candidate| !self.values.iter().any(|v| v.is(candidate)));
                codings.extend(others.map(|other| Value::new(*other, accept.parameters().to_vec())));
            } else {
                codings.push(accept.clone());
            }
        }
        codings
    }
}

impl From<Header> for AcceptEncoding {
    fn from(header: Header) -> Self {
        Self { values: header.all().to_vec() }
    }
}

#[cfg(test)]
mod tests {
    use super::AcceptEncoding;

    const CANDIDATES: &[&str] = &["gzip", "deflate", "identity"];

    fn best(header: &str) -> Option<&'static str> {
        AcceptEncoding::parse(header).select_best_encoding(CANDIDATES)
    }

    #[test]
    fn selects_identity_when_no_encoding_is_listed() {
        assert_eq!(best(""), Some("identity"));
    }

    #[test]
    fn selects_the_preferred_supported_encoding() {
        assert_eq!(best("compress, gzip"), Some("gzip"));
        assert_eq!(best("gzip; q=0.5, deflate"), Some("deflate"));
        assert_eq!(best("compress"), Some("identity"));
    }

    #[test]
    fn expands_wildcard_to_unlisted_candidates() {
        assert_eq!(best("*"), Some("gzip"));
        assert_eq!(best("gzip; q=0, *"), Some("deflate"));
    }

    #[test]
    fn gives_up_when_identity_is_refused() {
        assert_eq!(best("identity; q=0"), None);
        assert_eq!(best("*; q=0"), None);
        assert_eq!(best("compress, identity; q=0"), None);
    }
}
