//! Live-listener tests: connect info, graceful shutdown, diagnostics listener.

use std::time::Duration;

use axum::{extract::Request, routing::get, Router};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use exgin::diagnostics::DiagnosticsListener;
use exgin::http::request::{client_ip, X_TRACE_ID};
use exgin::{Engine, EngineConfig, Envelope, Shutdown};

mod common;

async fn whoami(request: Request) -> Envelope<Option<String>> {
    Envelope::success(client_ip(&request))
}

#[tokio::test]
async fn serves_until_shutdown() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let engine = Engine::new(EngineConfig {
        bind_address: addr.to_string(),
        metrics: true,
        ..Default::default()
    })
    .unwrap();
    let app = Router::new().route("/whoami", get(whoami));

    let shutdown = Shutdown::new();
    let server = tokio::spawn(engine.run(app, listener, shutdown.clone()));

    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap();

    let res = client
        .get(format!("http://{addr}/whoami"))
        .send()
        .await
        .expect("server unreachable");
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key(X_TRACE_ID));
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"], "127.0.0.1");

    let res = client
        .get(format!("http://{addr}/whoami"))
        .header("X-Forwarded-For", "203.0.113.7")
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"], "203.0.113.7");

    let metrics = client
        .get(format!("http://{addr}/metrics"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(
        common::sample(
            &metrics,
            "exgin_req_count",
            &[r#"path="/whoami""#, r#"status_code="200""#]
        ),
        Some(2.0)
    );

    shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}

async fn ask(addr: std::net::SocketAddr, command: u8) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(&[command]).await.unwrap();
    let mut reply = String::new();
    stream.read_to_string(&mut reply).await.unwrap();
    reply
}

#[tokio::test]
async fn diagnostics_listener_answers_commands() {
    let listener = DiagnosticsListener::bind("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let task = tokio::spawn(listener.run(shutdown.subscribe()));

    assert_eq!(ask(addr, 0x01).await, "pong\n");
    assert!(ask(addr, 0x04).await.starts_with("exgin "));
    assert!(ask(addr, 0x07).await.contains("alive_tasks: "));
    assert_eq!(ask(addr, 0x2a).await, "unknown command 0x2a\n");

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("listener did not stop")
        .unwrap();
}
