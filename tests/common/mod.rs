//! Test utilities for Socksgate integration tests

#![allow(dead_code)]

use socksgate::config::{ServerConfig, UserConfig};
use socksgate::socks::AuthMethod;
use socksgate::Socks5Server;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Create a test TCP listener on an available port
pub async fn create_test_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Spawn an echo server that serves any number of connections
pub async fn spawn_echo_server() -> SocketAddr {
    let (listener, addr) = create_test_listener().await;

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                loop {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if stream.write_all(&buf[..n]).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }
    });

    addr
}

/// Return a loopback address nothing is listening on
pub async fn closed_port() -> SocketAddr {
    let (listener, addr) = create_test_listener().await;
    drop(listener);
    addr
}

/// Server configuration bound to an ephemeral port
pub fn server_config() -> ServerConfig {
    ServerConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        ..Default::default()
    }
}

/// Server configuration requiring username/password
pub fn password_server_config(username: &str, password: &str) -> ServerConfig {
    ServerConfig {
        methods: vec![AuthMethod::Password],
        users: vec![UserConfig {
            username: username.to_string(),
            password: password.to_string(),
        }],
        ..server_config()
    }
}

/// Running server handle; the server stops when this is dropped
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown_tx: broadcast::Sender<bool>,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    /// Signal shutdown and wait for the accept loop to return
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        self.handle.await.unwrap().unwrap();
    }
}

/// Bind and run a server for the given configuration
pub async fn spawn_server(config: ServerConfig) -> TestServer {
    let mut server = Socks5Server::new(config).unwrap();
    let addr = server.bind().await.unwrap();

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = tokio::spawn(server.run(shutdown_rx));

    TestServer {
        addr,
        shutdown_tx,
        handle,
    }
}

/// CONNECT request for an IPv4 target
pub fn connect_request(target: SocketAddr) -> Vec<u8> {
    let SocketAddr::V4(v4) = target else {
        panic!("IPv4 target expected");
    };
    let mut request = vec![0x05, 0x01, 0x00, 0x01];
    request.extend_from_slice(&v4.ip().octets());
    request.extend_from_slice(&v4.port().to_be_bytes());
    request
}

/// CONNECT request for a domain target
pub fn connect_domain_request(domain: &str, port: u16) -> Vec<u8> {
    let mut request = vec![0x05, 0x01, 0x00, 0x03, domain.len() as u8];
    request.extend_from_slice(domain.as_bytes());
    request.extend_from_slice(&port.to_be_bytes());
    request
}

/// Username/password sub-negotiation frame
pub fn credentials_frame(username: &[u8], password: &[u8]) -> Vec<u8> {
    let mut frame = vec![0x05, username.len() as u8];
    frame.extend_from_slice(username);
    frame.push(password.len() as u8);
    frame.extend_from_slice(password);
    frame
}

/// Read a full IPv4 reply frame
pub async fn read_reply(stream: &mut TcpStream) -> [u8; 10] {
    let mut reply = [0u8; 10];
    stream.read_exact(&mut reply).await.unwrap();
    reply
}

/// Assert the peer closed the connection without sending more bytes
pub async fn assert_closed(stream: &mut TcpStream) {
    let mut buf = [0u8; 1];
    match stream.read(&mut buf).await {
        Ok(0) => {}
        Ok(n) => panic!("unexpected {} bytes after close", n),
        Err(_) => {}
    }
}
