use crate::application::{Application, DynApplication};
use crate::error::Error;
use crate::middleware::Middleware;
use crate::middlewares::RemoteUser;
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use http::header::{REFERER, USER_AGENT};
use std::sync::Arc;
use tracing::info;

const TIMESTAMP_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Logs one line per request in the Apache common log format, as `tracing` events with the
/// `molecule::access` target.
///
/// ```text
/// 192.168.0.1 - joe [10/Oct/2000:13:55:36 +0000] "GET /products?page=2 HTTP/1.1" 200 2326
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct ApacheCommonLogger;

/// Logs one line per request in the Apache combined log format, which adds the referer and
/// user agent to the common format.
#[derive(Debug, Default, Clone, Copy)]
pub struct ApacheCombinedLogger;

#[derive(Clone, Copy)]
enum Format {
    Common,
    Combined,
}

impl Middleware for ApacheCommonLogger {
    fn then(&self, next: DynApplication) -> DynApplication {
        Arc::new(AccessLogApp { format: Format::Common, next })
    }
}

impl Middleware for ApacheCombinedLogger {
    fn then(&self, next: DynApplication) -> DynApplication {
        Arc::new(AccessLogApp { format: Format::Combined, next })
    }
}

struct AccessLogApp {
    format: Format,
    next: DynApplication,
}

fn or_dash(value: Option<String>) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or_else(|| "-".to_string())
}

fn access_line(format: Format, request: &Request, response: &Response) -> String {
    let request_line = {
        let path_and_query = request.uri().path_and_query().map_or("/", |pq| pq.as_str());
        format!("{} {} {}", request.method(), path_and_query, request.protocol())
    };
    let mut line = format!(
        "{} - {} [{}] \"{}\" {} {}",
        or_dash(request.remote_ip().map(|ip| ip.to_string())),
        or_dash(request.attribute::<RemoteUser>().map(|user| user.name().to_string())),
        request.timestamp().format(TIMESTAMP_FORMAT),
        request_line,
        response.status().as_u16(),
        or_dash(response.size().or_else(|| response.content_length()).filter(|size| *size > 0).map(|size| size.to_string())),
    );
    if let Format::Combined = format {
        let referer = or_dash(request.header(REFERER).map(str::to_string));
        let user_agent = or_dash(request.header(USER_AGENT).map(str::to_string));
        line.push_str(&format!(" \"{referer}\" \"{user_agent}\""));
    }
    line
}

#[async_trait]
impl Application for AccessLogApp {
    async fn handle(&self, request: &mut Request) -> Result<Response, Error> {
        let response = self.next.handle(request).await?;
        info!(target: "molecule::access", "{}", access_line(self.format, request, &response));
        Ok(response)
    }
}
