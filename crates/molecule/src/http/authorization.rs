use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// The scheme and parameters of an `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    scheme: String,
    params: String,
}

impl Authorization {
    pub fn parse(header: &str) -> Self {
        let mut tokens = header.trim().splitn(2, ' ');
        let scheme = tokens.next().unwrap_or_default().to_string();
        let params = tokens.next().unwrap_or_default().trim().to_string();
        Self { scheme, params }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Schemes are compared case insensitively.
    pub fn has_scheme(&self, scheme: &str) -> bool {
        self.scheme.eq_ignore_ascii_case(scheme)
    }

    pub fn params(&self) -> &str {
        &self.params
    }
}

/// The username and password sent with the `Basic` scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    username: String,
    password: String,
}

impl BasicCredentials {
    pub fn new<U: Into<String>, P: Into<String>>(username: U, password: P) -> Self {
        Self { username: username.into(), password: password.into() }
    }

    /// Decodes base64 `username:password` params. Undecodable params yield empty credentials.
    pub fn decode(params: &str) -> Self {
        let decoded = STANDARD.decode(params.trim()).ok().and_then(|bytes| String::from_utf8(bytes).ok()).unwrap_or_default();
        match decoded.split_once(':') {
            Some((username, password)) => Self::new(username, password),
            None => Self::new(decoded, ""),
        }
    }

    pub fn encode(&self) -> String {
        STANDARD.encode(format!("{}:{}", self.username, self.password))
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}
