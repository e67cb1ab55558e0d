//! Shared utilities for host integration tests.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use uuid::Uuid;

use shopfront::{AppConfig, HostKind, WebHost};

/// Start a mock backend on an ephemeral port that always answers with the
/// given status and body. Returns its address.
#[allow(dead_code)]
pub async fn start_mock_backend(status: u16, body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// A throwaway static-asset directory containing an `index.html`.
#[allow(dead_code)]
pub fn static_root_with_index(content: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("shopfront-test-{}", Uuid::new_v4().simple()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("index.html"), content).unwrap();
    dir
}

/// Base configuration for a test host; identity URLs point at localhost so
/// validation passes without any real backend.
pub fn base_config(host: HostKind) -> AppConfig {
    AppConfig {
        host,
        identity_url: Some("http://127.0.0.1:5105".to_string()),
        identity_url_hc: Some("http://127.0.0.1:5105/hc".to_string()),
        callback_url: Some("http://127.0.0.1:5100".to_string()),
        ..AppConfig::default()
    }
}

/// Spawn a host on an ephemeral port and return its address. The host runs
/// until the test process exits.
pub async fn spawn_host(config: AppConfig) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let host = WebHost::new(config).expect("host construction failed");
    // The sender must outlive the test, otherwise the host sees the closed
    // channel as a shutdown signal.
    let (tx, rx) = broadcast::channel(1);
    std::mem::forget(tx);
    tokio::spawn(async move {
        let _ = host.run(listener, rx).await;
    });

    // Give the listener task a moment to start accepting.
    tokio::time::sleep(Duration::from_millis(100)).await;
    addr
}

#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}
