use rust_static_server::{start_server, Config, ServerHandle};
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::PathBuf;

fn start(max_requests: Option<usize>) -> ServerHandle {
    let config = Config {
        root_dir: PathBuf::from("test_resources"),
        port: 0,
        pool_size: 2,
        max_requests,
        ..Config::default()
    };
    start_server(&config).unwrap()
}

fn client() -> Client {
    Client::builder().redirect(Policy::none()).build().unwrap()
}

fn raw_request(handle: &ServerHandle, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(("127.0.0.1", handle.port)).unwrap();
    stream.write_all(request).unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

#[test]
fn downloads_get_request() {
    let handle = start(None);
    let url = format!("http://127.0.0.1:{}/index.html", handle.port);
    let response = client().get(&url).send().unwrap();
    assert_eq!(StatusCode::OK, response.status());
    assert_eq!("text/html", response.headers()["content-type"].to_str().unwrap());
    assert!(response.headers().contains_key("date"));
    assert!(response.headers()["server"].to_str().unwrap().starts_with("rust-static-server/"));
    assert!(response.text().unwrap().contains("root index"));
}

#[test]
fn returns_404_on_unknown_file() {
    let handle = start(None);
    let url = format!("http://127.0.0.1:{}/missing.html", handle.port);
    let response = client().get(&url).send().unwrap();
    assert_eq!(StatusCode::NOT_FOUND, response.status());
    assert!(response.text().unwrap().contains("Not Found"));
}

#[test]
fn redirects_directory_without_trailing_slash() {
    let handle = start(None);
    let url = format!("http://127.0.0.1:{}/docs", handle.port);
    let response = client().get(&url).send().unwrap();
    assert_eq!(StatusCode::FOUND, response.status());
    assert_eq!("/docs/", response.headers()["location"].to_str().unwrap());
}

#[test]
fn serves_index_of_directory() {
    let handle = start(None);
    let url = format!("http://127.0.0.1:{}/site/", handle.port);
    let response = client().get(&url).send().unwrap();
    assert_eq!(StatusCode::OK, response.status());
    let expected = std::fs::read("test_resources/site/index.html").unwrap();
    assert_eq!(expected, response.bytes().unwrap().to_vec());
}

#[test]
fn lists_directory_without_index() {
    let handle = start(None);
    let url = format!("http://127.0.0.1:{}/docs/", handle.port);
    let response = client().get(&url).send().unwrap();
    assert_eq!(StatusCode::OK, response.status());
    let body = response.text().unwrap();
    assert!(body.contains("Index of /docs/"));
    for href in &["readme.txt", "notes.html", "nested/", "hello%20world.txt"] {
        assert_eq!(1, body.matches(&format!("href=\"{}\"", href)).count(), "{}", href);
    }
}

#[test]
fn decodes_percent_encoded_path() {
    let handle = start(None);
    let url = format!("http://127.0.0.1:{}/docs/hello%20world.txt", handle.port);
    let response = client().get(&url).send().unwrap();
    assert_eq!(StatusCode::OK, response.status());
    assert_eq!("hello with a space\n", response.text().unwrap());
}

#[test]
fn rejects_malformed_request_line() {
    let handle = start(None);
    let response = raw_request(&handle, b"GET \r\n\r\n");
    assert!(response.starts_with("HTTP/1.0 400 Bad Request\r\n"));
}

#[test]
fn rejects_unsupported_method() {
    let handle = start(None);
    let response = raw_request(&handle, b"DELETE /index.html HTTP/1.0\r\n\r\n");
    assert!(response.starts_with("HTTP/1.0 501 Not Implemented\r\n"));
}

#[test]
fn forbids_path_traversal() {
    let handle = start(None);
    let response = raw_request(&handle, b"GET /docs/../../Cargo.toml HTTP/1.0\r\n\r\n");
    assert!(response.starts_with("HTTP/1.0 403 Forbidden\r\n"));
}

#[test]
fn closes_without_response_for_unknown_mime_type() {
    let handle = start(None);
    assert_eq!("", raw_request(&handle, b"GET /data.bin HTTP/1.0\r\n\r\n"));
}

#[test]
fn stops_after_max_requests() {
    let handle = start(Some(3));
    for _ in 0..3 {
        let response = raw_request(&handle, b"GET /docs/readme.txt HTTP/1.0\r\n\r\n");
        assert!(response.starts_with("HTTP/1.0 200 OK\r\n"));
    }
    assert!(handle.handle.join().unwrap().is_ok());
}
