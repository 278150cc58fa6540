//! Tests de integración para el servidor HTTP
//! tests/integration_test.rs
//!
//! Cada test levanta un servidor real en un puerto efímero con un document
//! root temporal y le habla HTTP crudo por TCP.

use static_server::config::Config;
use static_server::server::Server;
use std::fs;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

/// Servidor de prueba con su document root
struct TestServer {
    root: TempDir,
    server: Server,
}

impl TestServer {
    fn start() -> Self {
        Self::start_with(|_| {})
    }

    fn start_with(tweak: impl FnOnce(&mut Config)) -> Self {
        let root = tempfile::tempdir().expect("tempdir");
        let mut config = Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            accept_timeout_ms: 100,
            socket_timeout_ms: 2_000,
            document_root: root.path().to_path_buf(),
            core_pool_size: 2,
            max_pool_size: 4,
            queue_capacity: 8,
            ..Config::default()
        };
        tweak(&mut config);
        let server = Server::start(config).expect("server start");
        Self { root, server }
    }

    fn addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    fn write_file(&self, relative: &str, content: &[u8]) {
        let path = self.root.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
}

/// Helper: envía bytes crudos y retorna la response completa
fn send_raw(addr: SocketAddr, raw: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut stream = TcpStream::connect(addr)?;

    // Configurar timeouts
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;
    stream.set_write_timeout(Some(Duration::from_secs(5)))?;

    stream.write_all(raw)?;
    stream.flush()?;

    let mut response = Vec::new();
    stream.read_to_end(&mut response)?;
    Ok(response)
}

/// Helper: envía un request y retorna la response como texto
fn send_request(addr: SocketAddr, method: &str, path: &str) -> String {
    let request = format!("{} {} HTTP/1.1\r\nHost: localhost\r\n\r\n", method, path);
    let bytes = send_raw(addr, request.as_bytes()).expect("Failed to send request");
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Helper: separa headers del body
fn extract_body(response: &str) -> &str {
    match response.find("\r\n\r\n") {
        Some(pos) => &response[pos + 4..],
        None => "",
    }
}

fn status_line(response: &str) -> &str {
    response.lines().next().unwrap_or("")
}

fn header<'a>(response: &'a str, name: &str) -> Option<&'a str> {
    let head = &response[..response.find("\r\n\r\n")?];
    head.lines().skip(1).find_map(|line| {
        let (n, v) = line.split_once(':')?;
        n.eq_ignore_ascii_case(name).then(|| v.trim())
    })
}

#[test]
fn test_get_root_serves_index() {
    let server = TestServer::start();
    server.write_file("index.html", b"hi");

    let response = send_request(server.addr(), "GET", "/");

    assert_eq!(status_line(&response), "HTTP/1.1 200 OK");
    assert!(header(&response, "Content-Type").unwrap().starts_with("text/html"));
    assert_eq!(header(&response, "Content-Length"), Some("2"));
    assert_eq!(header(&response, "Connection"), Some("close"));
    assert!(header(&response, "Date").unwrap().ends_with("GMT"));
    assert!(header(&response, "Server").unwrap().starts_with("static_server/"));
    assert_eq!(extract_body(&response), "hi");
}

#[test]
fn test_traversal_never_leaks_host_files() {
    let server = TestServer::start();
    server.write_file("index.html", b"hi");

    for path in [
        "/../../etc/passwd",
        "/%2e%2e/%2e%2e/etc/passwd",
        "/..%2f..%2fetc%2fpasswd",
        "/sub/../../etc/passwd",
        "/..",
    ] {
        let response = send_request(server.addr(), "GET", path);
        let status = status_line(&response);
        assert!(
            status.starts_with("HTTP/1.1 403") || status.starts_with("HTTP/1.1 404"),
            "{} -> {}",
            path,
            status
        );
        assert!(!response.contains("root:"));
    }
}

#[test]
fn test_missing_file_is_404() {
    let server = TestServer::start();

    let response = send_request(server.addr(), "GET", "/missing.txt");

    assert_eq!(status_line(&response), "HTTP/1.1 404 Not Found");
    let body = extract_body(&response);
    assert!(body.contains("404"));
    assert!(body.contains("Not Found"));
}

#[test]
fn test_post_is_405() {
    let server = TestServer::start();
    server.write_file("index.html", b"hi");

    let response = send_request(server.addr(), "POST", "/");
    assert_eq!(status_line(&response), "HTTP/1.1 405 Method Not Allowed");

    let with_body = b"POST /index.html HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello";
    let response = String::from_utf8_lossy(&send_raw(server.addr(), with_body).unwrap()).into_owned();
    assert_eq!(status_line(&response), "HTTP/1.1 405 Method Not Allowed");
}

#[test]
fn test_empty_directory_listing() {
    let server = TestServer::start();
    fs::create_dir(server.root.path().join("empty")).unwrap();

    let response = send_request(server.addr(), "GET", "/empty/");

    assert_eq!(status_line(&response), "HTTP/1.1 200 OK");
    assert!(header(&response, "Content-Type").unwrap().starts_with("text/html"));
    let body = extract_body(&response);
    assert!(body.contains("Directory Listing: /empty"));
    assert!(body.contains(">..</a>"));
    assert!(!body.contains("class=\"file\""));
}

#[test]
fn test_listing_escapes_names() {
    let server = TestServer::start();
    server.write_file("docs/<b>&.txt", b"x");

    let response = send_request(server.addr(), "GET", "/docs/");
    let body = extract_body(&response);

    assert!(body.contains("&lt;b&gt;&amp;.txt"));
    assert!(!body.contains("<b>&.txt"));
}

#[test]
fn test_head_has_headers_but_no_body() {
    let server = TestServer::start();
    server.write_file("app.js", b"console.log(1);");

    let response = send_request(server.addr(), "HEAD", "/app.js");

    assert_eq!(status_line(&response), "HTTP/1.1 200 OK");
    assert_eq!(header(&response, "Content-Length"), Some("15"));
    assert!(header(&response, "Content-Type").unwrap().contains("javascript"));
    assert_eq!(extract_body(&response), "");
}

#[test]
fn test_malformed_request_is_400() {
    let server = TestServer::start();

    let bytes = send_raw(server.addr(), b"GARBAGE\r\n\r\n").unwrap();
    let response = String::from_utf8_lossy(&bytes);
    assert_eq!(status_line(&response), "HTTP/1.1 400 Bad Request");

    let bytes = send_raw(server.addr(), b"GET / HTTP/1.1 extra\r\n\r\n").unwrap();
    let response = String::from_utf8_lossy(&bytes);
    assert_eq!(status_line(&response), "HTTP/1.1 400 Bad Request");
}

#[test]
fn test_binary_file_is_byte_exact() {
    let server = TestServer::start();
    let data: Vec<u8> = (0..=255u8).cycle().take(70_000).collect();
    server.write_file("blob.bin", &data);

    let bytes = send_raw(server.addr(), b"GET /blob.bin HTTP/1.1\r\n\r\n").unwrap();
    let split = bytes.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;

    assert_eq!(&bytes[split..], &data[..]);
    let head = String::from_utf8_lossy(&bytes[..split]);
    assert!(head.contains("Content-Type: application/octet-stream\r\n"));
    assert!(head.contains("Content-Length: 70000\r\n"));
}

#[test]
fn test_query_and_encoding_are_normalized() {
    let server = TestServer::start();
    server.write_file("my notes/a.txt", b"plain");

    let response = send_request(server.addr(), "GET", "/my%20notes//a.txt?v=3");

    assert_eq!(status_line(&response), "HTTP/1.1 200 OK");
    assert!(header(&response, "Content-Type").unwrap().starts_with("text/plain"));
    assert_eq!(extract_body(&response), "plain");
}

#[test]
fn test_concurrent_clients() {
    let server = TestServer::start();
    server.write_file("index.html", b"hi");
    let addr = server.addr();

    let clients: Vec<_> = (0..8)
        .map(|_| thread::spawn(move || send_request(addr, "GET", "/")))
        .collect();

    for client in clients {
        let response = client.join().unwrap();
        assert_eq!(status_line(&response), "HTTP/1.1 200 OK");
    }

    server.server.shutdown();
    let stats = server.server.stats();
    assert_eq!(stats.total_connections, 8);
    assert_eq!(stats.active_connections, 0);
}

#[test]
fn test_saturated_pool_drops_connections() {
    let server = TestServer::start_with(|config| {
        config.core_pool_size = 1;
        config.max_pool_size = 1;
        config.queue_capacity = 1;
        config.socket_timeout_ms = 1_000;
    });
    let addr = server.addr();

    // Un cliente que no envía nada ocupa al único worker hasta el timeout,
    // otro espera en la cola
    let _busy = TcpStream::connect(addr).unwrap();
    thread::sleep(Duration::from_millis(200));
    let _queued = TcpStream::connect(addr).unwrap();
    thread::sleep(Duration::from_millis(200));

    // El tercero se rechaza: se cierra sin respuesta
    let bytes = send_raw(addr, b"GET / HTTP/1.1\r\n\r\n").unwrap_or_default();
    assert!(bytes.is_empty());

    server.server.shutdown();
    let stats = server.server.stats();
    assert_eq!(stats.total_connections, 3);
    assert_eq!(stats.active_connections, 0);
}
