use http::StatusCode;
use molecule::middlewares::{ContentLengthHeader, Cookies};
use molecule::routing::Router;
use molecule::{Error, Response, app_fn};
use molecule_server::{Engine, ServerConfig, WebServer};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

fn config(engine: Engine) -> ServerConfig {
    ServerConfig::builder().host("127.0.0.1").port(0).engine(engine).workers(2).server_name("molecule").build()
}

fn routes() -> Router {
    Router::draw(|routes| {
        routes.get("/hello/:name").to(app_fn(|request| {
            let name = request.parameter("name").unwrap_or_default();
            let greeting = request.parameter("greeting").unwrap_or("Hello");
            Ok(Response::text(StatusCode::OK, format!("{greeting}, {name}!")))
        }));
        routes.post("/echo").to(app_fn(|request| {
            let message = request.parameter("message").unwrap_or_default().to_string();
            Ok(Response::text(StatusCode::CREATED, message))
        }));
        routes.get("/whoami").to(app_fn(|request| {
            let ip = request.remote_ip().map(|ip| ip.to_string()).unwrap_or_default();
            Ok(Response::text(StatusCode::OK, ip))
        }));
        routes.get("/boom").to(app_fn(|_| Err(Error::app("Boom!"))));
    })
}

async fn exchange(addr: SocketAddr, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8(response).unwrap()
}

async fn get(addr: SocketAddr, path: &str) -> String {
    exchange(addr, &format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")).await
}

fn body_of(response: &str) -> &str {
    response.split_once("\r\n\r\n").map_or("", |(_, body)| body)
}

async fn started(engine: Engine) -> WebServer {
    let mut server = WebServer::new(config(engine));
    server.add(ContentLengthHeader).add(Cookies);
    server.start(routes()).await.unwrap();
    server
}

async fn serves_routes_with_query_parameters(engine: Engine) {
    let mut server = started(engine).await;
    let addr = server.local_addr().unwrap();

    let response = get(addr, "/hello/World?greeting=Hi").await;

    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.to_ascii_lowercase().contains("server: molecule"), "{response}");
    assert_eq!(body_of(&response), "Hi, World!");
    server.stop().await.unwrap();
}

async fn reads_form_parameters(engine: Engine) {
    let mut server = started(engine).await;
    let addr = server.local_addr().unwrap();
    let form = "message=Hello+there";

    let response = exchange(
        addr,
        &format!(
            "POST /echo HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{form}",
            form.len()
        ),
    )
    .await;

    assert!(response.starts_with("HTTP/1.1 201"), "{response}");
    assert_eq!(body_of(&response), "Hello there");
    server.stop().await.unwrap();
}

async fn knows_remote_address(engine: Engine) {
    let mut server = started(engine).await;
    let addr = server.local_addr().unwrap();

    let response = get(addr, "/whoami").await;

    assert_eq!(body_of(&response), "127.0.0.1");
    server.stop().await.unwrap();
}

async fn answers_not_found(engine: Engine) {
    let mut server = started(engine).await;
    let addr = server.local_addr().unwrap();

    let response = get(addr, "/missing").await;

    assert!(response.starts_with("HTTP/1.1 404"), "{response}");
    assert_eq!(body_of(&response), "Not found: /missing");
    server.stop().await.unwrap();
}

async fn reports_application_failures(engine: Engine) {
    let failures = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&failures);
    let mut server = WebServer::new(config(engine));
    server.report_failures_to(move |_: &Error| {
        counted.fetch_add(1, Ordering::SeqCst);
    });
    server.start(routes()).await.unwrap();
    let addr = server.local_addr().unwrap();

    let response = get(addr, "/boom").await;

    assert!(response.starts_with("HTTP/1.1 500"), "{response}");
    assert_eq!(failures.load(Ordering::SeqCst), 1);
    server.stop().await.unwrap();
}

async fn stops_serving(engine: Engine) {
    let mut server = started(engine).await;
    let port = server.local_addr().unwrap().port();

    server.stop().await.unwrap();

    assert!(server.local_addr().is_none());
    assert_eq!(server.uri(), format!("http://127.0.0.1:{}", 0));
    assert_ne!(port, 0);
    server.stop().await.unwrap();
}

macro_rules! engine_tests {
    ($($name:ident),* $(,)?) => {
        mod hyper_engine {
            use super::*;
            $(
                #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
                async fn $name() {
                    super::$name(Engine::Hyper).await;
                }
            )*
        }

        mod simple_engine {
            use super::*;
            $(
                #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
                async fn $name() {
                    super::$name(Engine::Simple).await;
                }
            )*
        }
    };
}

engine_tests!(
    serves_routes_with_query_parameters,
    reads_form_parameters,
    knows_remote_address,
    answers_not_found,
    reports_application_failures,
    stops_serving,
);
