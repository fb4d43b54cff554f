use crate::body::Body;
use crate::error::Error;
use crate::http::{ContentType, http_date};
use chrono::{DateTime, Utc};
use http::header::{AsHeaderName, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, IntoHeaderName, LOCATION};
use http::{HeaderMap, HeaderValue, StatusCode};

/// The response produced by an application, which middlewares may rewrite on its way back.
#[derive(Debug, Default)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
}

impl Response {
    pub fn of(status: StatusCode) -> Self {
        Self { status, headers: HeaderMap::new(), body: Body::empty() }
    }

    pub fn ok() -> Self {
        Self::of(StatusCode::OK)
    }

    pub fn not_found() -> Self {
        Self::of(StatusCode::NOT_FOUND)
    }

    /// A `text/plain` response.
    pub fn text<B: Into<Body>>(status: StatusCode, body: B) -> Self {
        Self::of(status).with_header(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8")).with_body(body)
    }

    /// A `text/html` response.
    pub fn html<B: Into<Body>>(status: StatusCode, body: B) -> Self {
        Self::of(status).with_header(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8")).with_body(body)
    }

    /// Redirects to `location` with the given status.
    pub fn redirect(location: &str, status: StatusCode) -> Result<Self, Error> {
        Ok(Self::of(status).with_header(LOCATION, HeaderValue::from_str(location)?))
    }

    /// Redirects with a 303 (see other).
    pub fn see_other(location: &str) -> Result<Self, Error> {
        Self::redirect(location, StatusCode::SEE_OTHER)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
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

    /// Sets a date header in the RFC 1123 format.
    pub fn set_date_header<K: IntoHeaderName>(&mut self, name: K, date: DateTime<Utc>) -> Result<&mut Self, Error> {
        self.set_header(name, &http_date::format(date))
    }

    pub fn remove_header<K: AsHeaderName>(&mut self, name: K) -> &mut Self {
        self.headers.remove(name);
        self
    }

    #[must_use]
    pub fn with_header<K: IntoHeaderName>(mut self, name: K, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE)
    }

    pub fn set_content_type(&mut self, content_type: &str) -> Result<&mut Self, Error> {
        self.set_header(CONTENT_TYPE, content_type)
    }

    /// The charset of the content type, if one is set.
    pub fn charset(&self) -> Option<String> {
        self.content_type().and_then(ContentType::parse).and_then(|content_type| content_type.charset().map(str::to_string))
    }

    /// Changes the charset of the content type. Has no effect when no content type is set.
    pub fn set_charset(&mut self, charset: &str) -> Result<&mut Self, Error> {
        match self.content_type().and_then(ContentType::parse) {
            Some(content_type) => self.set_content_type(&content_type.with_charset(charset).to_string()),
            None => Ok(self),
        }
    }

    pub fn content_length(&self) -> Option<u64> {
        self.header(CONTENT_LENGTH).and_then(|length| length.trim().parse().ok())
    }

    pub fn set_content_length(&mut self, length: u64) -> &mut Self {
        self.headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
        self
    }

    pub fn content_encoding(&self) -> Option<&str> {
        self.header(CONTENT_ENCODING)
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    pub fn set_body<B: Into<Body>>(&mut self, body: B) -> &mut Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_body<B: Into<Body>>(mut self, body: B) -> Self {
        self.body = body.into();
        self
    }

    /// The size of the body, when known before sending.
    pub fn size(&self) -> Option<u64> {
        self.body.size()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn into_parts(self) -> (StatusCode, HeaderMap, Body) {
        (self.status, self.headers, self.body)
    }
}

impl From<Response> for http::Response<Body> {
    fn from(response: Response) -> Self {
        let mut converted = http::Response::new(response.body);
        *converted.status_mut() = response.status;
        *converted.headers_mut() = response.headers;
        converted
    }
}

#[cfg(test)]
mod tests {
    use super::Response;
    use http::StatusCode;
    use http::header::{CONTENT_TYPE, LOCATION, SET_COOKIE};

    #[test]
    fn redirects_to_other_location() {
        let response = Response::see_other("/login").unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.header(LOCATION), Some("/login"));
    }

    #[test]
    fn changes_charset_of_content_type() {
        let mut response = Response::ok();
        response.set_charset("utf-8").unwrap();
        assert_eq!(response.content_type(), None);

        response.set_content_type("text/html").unwrap();
        response.set_charset("utf-8").unwrap();
        assert_eq!(response.header(CONTENT_TYPE), Some("text/html; charset=utf-8"));
        assert_eq!(response.charset(), Some("utf-8".to_string()));
    }

    #[test]
    fn keeps_multiple_values_of_added_headers() {
        let mut response = Response::ok();
        response.add_header(SET_COOKIE, "a=1").unwrap();
        response.add_header(SET_COOKIE, "b=2").unwrap();

        assert_eq!(response.headers_named(SET_COOKIE), vec!["a=1", "b=2"]);
        assert_eq!(response.header(SET_COOKIE), Some("a=1"));
    }

    #[test]
    fn knows_size_of_fixed_bodies() {
        let response = Response::text(StatusCode::OK, "Hello");

        assert_eq!(response.size(), Some(5));
        assert!(!response.is_empty());
        assert!(Response::ok().is_empty());
    }

    #[test]
    fn rejects_invalid_header_values() {
        let mut response = Response::ok();

        assert!(response.set_header("x-custom", "line\nbreak").is_err());
    }
}
