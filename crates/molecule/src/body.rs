use crate::error::BoxError;
use bytes::Bytes;
use http_body::Body as HttpBody;
use http_body::{Frame, SizeHint};
use http_body_util::BodyExt;
use http_body_util::combinators::UnsyncBoxBody;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

/// The body of a [`Response`](crate::Response).
///
/// Either a single chunk known up front, or a boxed stream whose size may be unknown
/// (e.g. a file being read, or a compressed body).
pub struct Body {
    inner: Kind,
}

enum Kind {
    Once(Option<Bytes>),
    Stream(UnsyncBoxBody<Bytes, BoxError>),
}

impl Body {
    pub fn empty() -> Self {
        Self { inner: Kind::Once(None) }
    }

    pub fn once(bytes: Bytes) -> Self {
        if bytes.is_empty() { Self::empty() } else { Self { inner: Kind::Once(Some(bytes)) } }
    }

    pub fn text<S: Into<String>>(text: S) -> Self {
        Self::once(Bytes::from(text.into()))
    }

    pub fn stream<B>(body: B) -> Self
    where
        B: HttpBody<Data = Bytes, Error = BoxError> + Send + 'static,
    {
        Self { inner: Kind::Stream(UnsyncBoxBody::new(body)) }
    }

    /// The exact size of the body, when it is known before sending.
    pub fn size(&self) -> Option<u64> {
        self.size_hint().exact()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == Some(0)
    }

    /// Takes the body out, leaving an empty body behind.
    pub fn take(&mut self) -> Body {
        std::mem::replace(self, Body::empty())
    }

    pub fn replace(&mut self, body: Body) {
        *self = body;
    }

    /// Collects the whole body in memory.
    pub async fn into_bytes(self) -> Result<Bytes, BoxError> {
        match self.inner {
            Kind::Once(option) => Ok(option.unwrap_or_default()),
            Kind::Stream(stream) => Ok(stream.collect().await?.to_bytes()),
        }
    }

    /// Collects the whole body, keeping a copy in place so it can still be sent.
    pub async fn buffer(&mut self) -> Result<Bytes, BoxError> {
        let bytes = self.take().into_bytes().await?;
        self.replace(Body::once(bytes.clone()));
        Ok(bytes)
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Kind::Once(bytes) => f.debug_tuple("Body::Once").field(bytes).finish(),
            Kind::Stream(_) => f.write_str("Body::Stream"),
        }
    }
}

impl From<String> for Body {
    fn from(value: String) -> Self {
        Self::once(Bytes::from(value))
    }
}

impl From<&'static str> for Body {
    fn from(value: &'static str) -> Self {
        Self::once(Bytes::from_static(value.as_bytes()))
    }
}

impl From<Bytes> for Body {
    fn from(value: Bytes) -> Self {
        Self::once(value)
    }
}

impl From<Vec<u8>> for Body {
    fn from(value: Vec<u8>) -> Self {
        Self::once(Bytes::from(value))
    }
}

impl From<()> for Body {
    fn from((): ()) -> Self {
        Self::empty()
    }
}

impl HttpBody for Body {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let kind = &mut self.get_mut().inner;
        match kind {
            Kind::Once(option_bytes) => Poll::Ready(option_bytes.take().map(|bytes| Ok(Frame::data(bytes)))),
            Kind::Stream(box_body) => {
                let pin = Pin::new(box_body);
                pin.poll_frame(cx)
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        match &self.inner {
            Kind::Once(option_bytes) => option_bytes.is_none(),
            Kind::Stream(box_body) => box_body.is_end_stream(),
        }
    }

    fn size_hint(&self) -> SizeHint {
        match &self.inner {
            Kind::Once(None) => SizeHint::with_exact(0),
            Kind::Once(Some(bytes)) => SizeHint::with_exact(bytes.len() as u64),
            Kind::Stream(box_body) => box_body.size_hint(),
        }
    }
}
