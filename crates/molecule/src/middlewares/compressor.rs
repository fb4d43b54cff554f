//! Response compression negotiated with `Accept-Encoding`.
//!
//! The main components are:
//! - `Writer`: an in-memory sink collecting the encoder output
//! - `Encoder`: the gzip, deflate, zstd and brotli stream encoders
//! - `EncodedBody`: a body wrapper feeding every frame of the original body through an encoder
//! - [`Compressor`]: the middleware picking the coding and rewriting the response

use crate::application::{Application, DynApplication};
use crate::body::Body;
use crate::error::{BoxError, Error};
use crate::http::{AcceptEncoding, mime_types};
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use bytes::{Buf, Bytes, BytesMut};
use flate2::Compression;
use flate2::write::{GzEncoder, ZlibEncoder};
use http::header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH, VARY};
use http::{HeaderValue, StatusCode};
use http_body::{Body as HttpBody, Frame};
use pin_project_lite::pin_project;
use std::io;
use std::io::Write;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};
use tracing::trace;
use zstd::stream::write::Encoder as ZstdEncoder;

const CODINGS: &[&str] = &["gzip", "deflate", "zstd", "br", "identity"];

struct Writer {
    buf: BytesMut,
}

impl Writer {
    fn new() -> Self {
        Self { buf: BytesMut::with_capacity(4096) }
    }

    fn take(&mut self) -> Bytes {
        self.buf.split().freeze()
    }
}

impl io::Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

enum Encoder {
    Gzip(GzEncoder<Writer>),
    /// Deflate is the zlib format.
    Deflate(ZlibEncoder<Writer>),
    Zstd(ZstdEncoder<'static, Writer>),
    Br(Box<brotli::CompressorWriter<Writer>>),
}

impl Encoder {
    fn for_coding(coding: &str) -> io::Result<Option<Self>> {
        let encoder = match coding {
            "gzip" => Self::Gzip(GzEncoder::new(Writer::new(), Compression::default())),
            "deflate" => Self::Deflate(ZlibEncoder::new(Writer::new(), Compression::default())),
            "zstd" => Self::Zstd(ZstdEncoder::new(Writer::new(), 6)?),
            "br" => Self::Br(Box::new(brotli::CompressorWriter::new(
                Writer::new(),
                32 * 1024, // 32 KiB buffer
                3,         // BROTLI_PARAM_QUALITY
                22,        // BROTLI_PARAM_LGWIN
            ))),
            _ => return Ok(None),
        };
        Ok(Some(encoder))
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        let result = match self {
            Self::Gzip(encoder) => encoder.write_all(data),
            Self::Deflate(encoder) => encoder.write_all(data),
            Self::Zstd(encoder) => encoder.write_all(data),
            Self::Br(encoder) => encoder.write_all(data),
        };
        if let Err(e) = &result {
            trace!(cause = %e, "could not encode response chunk");
        }
        result
    }

    fn take(&mut self) -> Bytes {
        match self {
            Self::Gzip(encoder) => encoder.get_mut().take(),
            Self::Deflate(encoder) => encoder.get_mut().take(),
            Self::Zstd(encoder) => encoder.get_mut().take(),
            Self::Br(encoder) => encoder.get_mut().take(),
        }
    }

    fn finish(self) -> io::Result<Bytes> {
        let writer = match self {
            Self::Gzip(encoder) => encoder.finish()?,
            Self::Deflate(encoder) => encoder.finish()?,
            Self::Zstd(encoder) => encoder.finish()?,
            Self::Br(mut encoder) => {
                encoder.flush()?;
                encoder.into_inner()
            }
        };
        Ok(writer.buf.freeze())
    }
}

pin_project! {
    struct EncodedBody {
        #[pin]
        inner: Body,
        encoder: Option<Encoder>,
    }
}

impl EncodedBody {
    fn new(inner: Body, encoder: Encoder) -> Self {
        Self { inner, encoder: Some(encoder) }
    }
}

impl HttpBody for EncodedBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let mut this = self.project();

        loop {
            let Some(encoder) = this.encoder.as_mut() else {
                return Poll::Ready(None);
            };

            return match ready!(this.inner.as_mut().poll_frame(cx)) {
                Some(Ok(frame)) => {
                    let Ok(data) = frame.into_data() else {
                        continue;
                    };
                    encoder.write(data.chunk())?;
                    let bytes = encoder.take();
                    if bytes.is_empty() {
                        continue;
                    }
                    Poll::Ready(Some(Ok(Frame::data(bytes))))
                }
                Some(Err(e)) => Poll::Ready(Some(Err(e))),
                None => match this.encoder.take().map(Encoder::finish) {
                    Some(Ok(bytes)) if !bytes.is_empty() => Poll::Ready(Some(Ok(Frame::data(bytes)))),
                    Some(Err(e)) => Poll::Ready(Some(Err(e.into()))),
                    _ => Poll::Ready(None),
                },
            };
        }
    }

    fn is_end_stream(&self) -> bool {
        self.encoder.is_none()
    }
}

/// Compresses response bodies with the best coding the client accepts.
///
/// Supports `gzip`, `deflate`, `zstd` and `br`. When the client refuses every coding, including
/// `identity`, the response becomes `406 Not Acceptable`. Compression can be limited to a list of
/// content types, which may use wildcards such as `text/*`.
#[derive(Debug, Clone, Default)]
pub struct Compressor {
    compressible_types: Vec<String>,
}

impl Compressor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only compresses responses of these content types.
    #[must_use]
    pub fn compressible_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.compressible_types.extend(types.into_iter().map(Into::into));
        self
    }
}

impl Middleware for Compressor {
    fn then(&self, next: DynApplication) -> DynApplication {
        Arc::new(CompressorApp { compressible_types: self.compressible_types.clone(), next })
    }
}

struct CompressorApp {
    compressible_types: Vec<String>,
    next: DynApplication,
}

impl CompressorApp {
    fn compressible(&self, response: &Response) -> bool {
        if self.compressible_types.is_empty() {
            return true;
        }
        response
            .content_type()
            .is_some_and(|content_type| self.compressible_types.iter().any(|pattern| mime_types::matches(content_type, pattern)))
    }
}

#[async_trait]
impl Application for CompressorApp {
    async fn handle(&self, request: &mut Request) -> Result<Response, Error> {
        let mut response = self.next.handle(request).await?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT || status == StatusCode::SWITCHING_PROTOCOLS || status == StatusCode::NOT_MODIFIED {
            return Ok(response);
        }
        if response.has_header(CONTENT_ENCODING) || response.is_empty() || !self.compressible(&response) {
            return Ok(response);
        }

        let accept_encoding = AcceptEncoding::parse(request.header(ACCEPT_ENCODING).unwrap_or_default());
        let Some(coding) = accept_encoding.select_best_encoding(CODINGS) else {
            return Ok(Response::text(StatusCode::NOT_ACCEPTABLE, "An acceptable encoding could not be found"));
        };

        response.headers_mut().append(VARY, HeaderValue::from_static("Accept-Encoding"));
        let Some(encoder) = Encoder::for_coding(coding)? else {
            return Ok(response);
        };

        let body = response.body_mut().take();
        response.set_body(Body::stream(EncodedBody::new(body, encoder)));
        response.remove_header(CONTENT_LENGTH);
        response.headers_mut().insert(CONTENT_ENCODING, HeaderValue::from_static(coding));
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::Compressor;
    use crate::application::{Application, app_fn};
    use crate::middleware::Middleware;
    use crate::request::Request;
    use crate::response::Response;
    use flate2::read::{GzDecoder, ZlibDecoder};
    use http::header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, VARY};
    use http::{HeaderValue, StatusCode};
    use std::io::Read;
    use std::sync::Arc;

    const CONTENT: &str = "uncompressed content, repeated. uncompressed content, repeated.";

    fn compressor() -> Compressor {
        Compressor::new()
    }

    async fn serve(compressor: Compressor, accept_encoding: Option<&'static str>, response: fn() -> Response) -> Response {
        let app = compressor.then(Arc::new(app_fn(move |_| Ok(response()))));
        let mut request = Request::get("/");
        if let Some(accept_encoding) = accept_encoding {
            request = request.with_header(ACCEPT_ENCODING, HeaderValue::from_static(accept_encoding));
        }
        app.handle(&mut request).await.unwrap()
    }

    fn content() -> Response {
        Response::text(StatusCode::OK, CONTENT).with_header(CONTENT_LENGTH, HeaderValue::from(CONTENT.len()))
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        let (_, _, body) = response.into_parts();
        body.into_bytes().await.unwrap().to_vec()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn gzips_when_client_prefers_gzip() {
        let response = serve(compressor(), Some("deflate; q=0.5, gzip"), content).await;

        assert_eq!(response.content_encoding(), Some("gzip"));
        assert_eq!(response.header(VARY), Some("Accept-Encoding"));
        assert!(!response.has_header(CONTENT_LENGTH));

        let mut inflated = String::new();
        GzDecoder::new(body_bytes(response).await.as_slice()).read_to_string(&mut inflated).unwrap();
        assert_eq!(inflated, CONTENT);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn deflates_with_zlib_format() {
        let response = serve(compressor(), Some("deflate"), content).await;

        assert_eq!(response.content_encoding(), Some("deflate"));
        let mut inflated = String::new();
        ZlibDecoder::new(body_bytes(response).await.as_slice()).read_to_string(&mut inflated).unwrap();
        assert_eq!(inflated, CONTENT);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn compresses_with_zstd() {
        let response = serve(compressor(), Some("zstd"), content).await;

        assert_eq!(response.content_encoding(), Some("zstd"));
        let decoded = zstd::decode_all(body_bytes(response).await.as_slice()).unwrap();
        assert_eq!(decoded, CONTENT.as_bytes());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn sends_identity_when_no_coding_is_accepted() {
        let response = serve(compressor(), None, content).await;

        assert_eq!(response.content_encoding(), None);
        assert_eq!(response.content_length(), Some(CONTENT.len() as u64));
        assert_eq!(body_bytes(response).await, CONTENT.as_bytes());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn refuses_when_no_acceptable_coding_remains() {
        let response = serve(compressor(), Some("compress, identity; q=0"), content).await;

        assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn skips_empty_and_already_encoded_bodies() {
        let empty = serve(compressor(), Some("gzip"), Response::ok).await;
        let encoded = serve(compressor(), Some("gzip"), || {
            Response::text(StatusCode::OK, "...").with_header(CONTENT_ENCODING, HeaderValue::from_static("br"))
        })
        .await;

        assert_eq!(empty.content_encoding(), None);
        assert_eq!(encoded.content_encoding(), Some("br"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn only_compresses_configured_types() {
        let compressor = || Compressor::new().compressible_types(["text/*", "application/json"]);

        let text = serve(compressor(), Some("gzip"), content).await;
        let image = serve(compressor(), Some("gzip"), || {
            Response::ok().with_header(CONTENT_TYPE, HeaderValue::from_static("image/png")).with_body(CONTENT)
        })
        .await;

        assert_eq!(text.content_encoding(), Some("gzip"));
        assert_eq!(image.content_encoding(), None);
    }
}
