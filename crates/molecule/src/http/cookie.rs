use std::fmt;

/// An HTTP cookie, as received in a `Cookie` header or sent in a `Set-Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
    version: u32,
    max_age: Option<i64>,
    domain: Option<String>,
    path: Option<String>,
    secure: bool,
    http_only: bool,
}

impl Cookie {
    pub fn new<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            version: 1,
            max_age: None,
            domain: None,
            path: Some("/".to_string()),
            secure: false,
            http_only: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Lifetime in seconds. `None` makes a session cookie, `Some(0)` asks the client to drop it.
    pub fn max_age(&self) -> Option<i64> {
        self.max_age
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn secure(&self) -> bool {
        self.secure
    }

    pub fn http_only(&self) -> bool {
        self.http_only
    }

    #[must_use]
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    #[must_use]
    pub fn with_max_age(mut self, max_age: Option<i64>) -> Self {
        self.max_age = max_age;
        self
    }

    #[must_use]
    pub fn with_domain<S: Into<String>>(mut self, domain: S) -> Self {
        self.domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn with_path<S: Into<String>>(mut self, path: Option<S>) -> Self {
        self.path = path.map(Into::into);
        self
    }

    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }
}

/// Renders the cookie as a `Set-Cookie` header value.
impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if let Some(path) = &self.path {
            write!(f, "; path={path}")?;
        }
        if let Some(domain) = &self.domain {
            write!(f, "; domain={domain}")?;
        }
        if let Some(max_age) = self.max_age {
            write!(f, "; max-age={max_age}")?;
        }
        if self.secure {
            f.write_str("; secure")?;
        }
        if self.http_only {
            f.write_str("; httponly")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Cookie;

    #[test]
    fn renders_a_session_cookie_at_root_by_default() {
        assert_eq!(Cookie::new("name", "value").to_string(), "name=value; path=/");
    }

    #[test]
    fn renders_all_attributes() {
        let cookie = Cookie::new("sid", "42")
            .with_path(Some("/app"))
            .with_domain("example.com")
            .with_max_age(Some(0))
            .with_secure(true)
            .with_http_only(true);

        assert_eq!(cookie.to_string(), "sid=42; path=/app; domain=example.com; max-age=0; secure; httponly");
    }
}
