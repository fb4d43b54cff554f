//! The request seen by applications and middlewares.
//!
//! A [`Request`] is a mutable value: middlewares rewrite its path, method or parameters and
//! bind typed attributes (the session, the cookie jar, the selected locale...) before handing
//! it to the next application in the chain.

use crate::error::Error;
use crate::http::{AcceptLanguage, ContentType, Cookie, Locale, cookie_decoder};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::header::{AsHeaderName, IntoHeaderName};
use http::{Extensions, HeaderMap, HeaderValue, Method, Uri, Version};
use std::net::{IpAddr, SocketAddr};

#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    path: String,
    version: Version,
    remote_addr: Option<SocketAddr>,
    remote_host: Option<String>,
    secure: bool,
    timestamp: DateTime<Utc>,
    headers: HeaderMap,
    parameters: Vec<(String, String)>,
    attributes: Extensions,
    body: Bytes,
}

impl Request {
    pub fn new(method: Method, uri: Uri) -> Self {
        let path = decode_path(uri.path());
        Self {
            method,
            uri,
            path,
            version: Version::HTTP_11,
            remote_addr: None,
            remote_host: None,
            secure: false,
            timestamp: Utc::now(),
            headers: HeaderMap::new(),
            parameters: Vec::new(),
            attributes: Extensions::new(),
            body: Bytes::new(),
        }
    }

    /// Creates a request for `uri`. An invalid uri falls back to `/`.
    pub fn with_method(method: Method, uri: &str) -> Self {
        Self::new(method, uri.parse().unwrap_or_default())
    }

    pub fn get(uri: &str) -> Self {
        Self::with_method(Method::GET, uri)
    }

    pub fn post(uri: &str) -> Self {
        Self::with_method(Method::POST, uri)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn set_method(&mut self, method: Method) -> &mut Self {
        self.method = method;
        self
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Replaces the request uri, resetting the path to the path of the new uri.
    pub fn set_uri(&mut self, uri: Uri) -> &mut Self {
        self.path = decode_path(uri.path());
        self.uri = uri;
        self
    }

    /// The path the current application sees, which differs from the uri path under a mount point.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn set_path<S: Into<String>>(&mut self, path: S) -> &mut Self {
        self.path = path.into();
        self
    }

    /// The full url, rebuilt from the scheme, the `Host` header and the request uri.
    pub fn url(&self) -> String {
        let host = self.header(http::header::HOST).or_else(|| self.uri.authority().map(|a| a.as_str())).unwrap_or("localhost");
        let path_and_query = self.uri.path_and_query().map_or("/", |pq| pq.as_str());
        format!("{}://{}{}", self.scheme(), host, path_and_query)
    }

    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn set_version(&mut self, version: Version) -> &mut Self {
        self.version = version;
        self
    }

    /// The protocol, as in `HTTP/1.1`.
    pub fn protocol(&self) -> String {
        format!("{:?}", self.version)
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn set_remote_addr(&mut self, addr: SocketAddr) -> &mut Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn remote_ip(&self) -> Option<IpAddr> {
        self.remote_addr.map(|addr| addr.ip())
    }

    pub fn remote_port(&self) -> Option<u16> {
        self.remote_addr.map(|addr| addr.port())
    }

    /// The remote host name, defaulting to the remote ip when the host was not resolved.
    pub fn remote_host(&self) -> Option<String> {
        self.remote_host.clone().or_else(|| self.remote_ip().map(|ip| ip.to_string()))
    }

    pub fn set_remote_host<S: Into<String>>(&mut self, host: S) -> &mut Self {
        self.remote_host = Some(host.into());
        self
    }

    pub fn secure(&self) -> bool {
        self.secure
    }

    pub fn set_secure(&mut self, secure: bool) -> &mut Self {
        self.secure = secure;
        self
    }

    pub fn scheme(&self) -> &'static str {
        if self.secure { "https" } else { "http" }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: DateTime<Utc>) -> &mut Self {
        self.timestamp = timestamp;
        self
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn has_header<K: AsHeaderName>(&self, name: K) -> bool {
        self.headers.contains_key(name)
    }

    /// The first value of the header, if present and made of visible ascii characters.
    pub fn header<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn headers_named<K: AsHeaderName>(&self, name: K) -> Vec<&str> {
        self.headers.get_all(name).iter().filter_map(|value| value.to_str().ok()).collect()
    }

    pub fn add_header<K: IntoHeaderName>(&mut self, name: K, value: &str) -> Result<&mut Self, Error> {
        self.headers.append(name, HeaderValue::from_str(value)?);
        Ok(self)
    }

    pub fn set_header<K: IntoHeaderName>(&mut self, name: K, value: &str) -> Result<&mut Self, Error> {
        self.headers.insert(name, HeaderValue::from_str(value)?);
        Ok(self)
    }

    pub fn remove_header<K: AsHeaderName>(&mut self, name: K) -> &mut Self {
        self.headers.remove(name);
        self
    }

    /// Builder flavour of [`Request::add_header`], for already validated header values.
    #[must_use]
    pub fn with_header<K: IntoHeaderName>(mut self, name: K, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// The cookies sent by the client in the `Cookie` headers.
    pub fn cookies(&self) -> Vec<Cookie> {
        self.headers_named(http::header::COOKIE).into_iter().flat_map(cookie_decoder::decode).collect()
    }

    pub fn cookie(&self, name: &str) -> Option<Cookie> {
        self.cookies().into_iter().find(|cookie| cookie.name() == name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(http::header::CONTENT_TYPE)
    }

    pub fn content_length(&self) -> Option<u64> {
        self.header(http::header::CONTENT_LENGTH).and_then(|length| length.trim().parse().ok())
    }

    /// The charset of the `Content-Type` header, if any.
    pub fn charset(&self) -> Option<String> {
        self.content_type().and_then(ContentType::parse).and_then(|content_type| content_type.charset().map(str::to_string))
    }

    /// The value of the named parameter, the last one when the parameter is repeated.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.iter().rev().find(|(n, _)| n == name).map(|(_, value)| value.as_str())
    }

    pub fn parameters(&self, name: &str) -> Vec<&str> {
        self.parameters.iter().filter(|(n, _)| n == name).map(|(_, value)| value.as_str()).collect()
    }

    pub fn parameter_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for (name, _) in &self.parameters {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        names
    }

    pub fn all_parameters(&self) -> &[(String, String)] {
        &self.parameters
    }

    pub fn add_parameter<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) -> &mut Self {
        self.parameters.push((name.into(), value.into()));
        self
    }

    pub fn remove_parameter(&mut self, name: &str) -> &mut Self {
        self.parameters.retain(|(n, _)| n != name);
        self
    }

    #[must_use]
    pub fn with_parameter<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.add_parameter(name, value);
        self
    }

    pub fn attribute<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.attributes.get::<T>()
    }

    pub fn attribute_mut<T: Send + Sync + 'static>(&mut self) -> Option<&mut T> {
        self.attributes.get_mut::<T>()
    }

    /// Binds a typed attribute, returning the value previously bound for that type.
    pub fn set_attribute<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.attributes.insert(value)
    }

    pub fn remove_attribute<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.attributes.remove::<T>()
    }

    pub fn attributes(&self) -> &Extensions {
        &self.attributes
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn set_body<B: Into<Bytes>>(&mut self, body: B) -> &mut Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_body<B: Into<Bytes>>(mut self, body: B) -> Self {
        self.body = body.into();
        self
    }

    /// The body decoded as text using the request charset, UTF-8 by default.
    pub fn body_text(&self) -> Result<String, Error> {
        match self.charset() {
            Some(charset) if is_latin1(&charset) => Ok(self.body.iter().map(|&b| char::from(b)).collect()),
            _ => String::from_utf8(self.body.to_vec()).map_err(Error::invalid_body),
        }
    }

    /// The locales accepted by the client, in order of preference.
    pub fn locales(&self) -> Vec<Locale> {
        self.header(http::header::ACCEPT_LANGUAGE).map(AcceptLanguage::parse).unwrap_or_default().list().to_vec()
    }

    /// The locale preferred by the client.
    pub fn locale(&self) -> Option<Locale> {
        self.locales().into_iter().next()
    }
}

fn is_latin1(charset: &str) -> bool {
    ["iso-8859-1", "latin1", "us-ascii"].iter().any(|name| charset.eq_ignore_ascii_case(name))
}

/// Percent-decodes each segment of `path`. An encoded `/` stays encoded so segments are kept
/// apart, and a segment that is not valid UTF-8 once decoded is left as is.
fn decode_path(path: &str) -> String {
    if !path.contains('%') {
        return path.to_string();
    }
    path.split('/')
        .map(|segment| match urlencoding::decode(segment) {
            Ok(decoded) => decoded.replace('/', "%2F"),
            Err(_) => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}
