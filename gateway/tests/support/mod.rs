//! Shared helpers for the integration tests: a tiny HTTP endpoint that
//! records what it receives, and a blocking line-oriented SMTP client.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use url::Url;

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// One request as seen by [`MockWebhook`].
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// What the mock answers with.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub location: Option<String>,
    pub body: String,
}

impl MockResponse {
    pub fn status(status: u16) -> Self {
        Self {
            status,
            location: None,
            body: String::new(),
        }
    }

    pub fn redirect(status: u16, location: &str) -> Self {
        Self {
            status,
            location: Some(location.to_string()),
            body: String::new(),
        }
    }
}

/// HTTP/1.1 endpoint on a background thread. Every connection serves one
/// request and is closed.
pub struct MockWebhook {
    addr: SocketAddr,
    requests: mpsc::Receiver<CapturedRequest>,
}

impl MockWebhook {
    /// Answer every request with `status`.
    pub fn with_status(status: u16) -> Self {
        Self::start(move |_| MockResponse::status(status))
    }

    pub fn start<F>(respond: F) -> Self
    where
        F: Fn(&CapturedRequest) -> MockResponse + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let Some(request) = read_request(&stream) else {
                    continue;
                };
                let response = respond(&request);
                // Record before answering so the client never sees a reply
                // for a request the test cannot observe yet.
                if tx.send(request).is_err() {
                    break;
                }
                write_response(&stream, &response);
            }
        });

        Self { addr, requests: rx }
    }

    pub fn url(&self, path: &str) -> Url {
        Url::parse(&format!("http://{}{}", self.addr, path)).unwrap()
    }

    pub fn next_request(&self) -> Option<CapturedRequest> {
        self.requests.recv_timeout(TIMEOUT).ok()
    }

    /// Requests that already arrived, without waiting.
    pub fn drain(&self) -> Vec<CapturedRequest> {
        self.requests.try_iter().collect()
    }
}

fn read_request(stream: &TcpStream) -> Option<CapturedRequest> {
    stream.set_read_timeout(Some(TIMEOUT)).ok()?;
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        let (name, value) = line.split_once(':')?;
        headers.push((name.trim().to_string(), value.trim().to_string()));
    }

    let length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).ok()?;

    Some(CapturedRequest {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

fn write_response(mut stream: &TcpStream, response: &MockResponse) {
    let mut head = format!(
        "HTTP/1.1 {} Mock\r\nContent-Length: {}\r\nConnection: close\r\n",
        response.status,
        response.body.len()
    );
    if let Some(location) = &response.location {
        head.push_str(&format!("Location: {location}\r\n"));
    }
    head.push_str("\r\n");

    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(response.body.as_bytes());
    let _ = stream.flush();
}

/// Minimal blocking SMTP client speaking one line at a time.
pub struct SmtpClient {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl SmtpClient {
    pub fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).unwrap();
        stream.set_read_timeout(Some(TIMEOUT)).unwrap();
        let writer = stream.try_clone().unwrap();
        Self {
            reader: BufReader::new(stream),
            writer,
        }
    }

    /// Next reply line without its terminator.
    pub fn read_reply(&mut self) -> String {
        let mut line = String::new();
        self.reader.read_line(&mut line).unwrap();
        line.trim_end_matches(['\r', '\n']).to_string()
    }

    /// Send a line without waiting for a reply (body lines are silent).
    pub fn send_line(&mut self, line: &str) {
        self.writer.write_all(format!("{line}\r\n").as_bytes()).unwrap();
        self.writer.flush().unwrap();
    }

    /// Send raw bytes as-is.
    pub fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).unwrap();
        self.writer.flush().unwrap();
    }

    /// Send a command and return its reply.
    pub fn command(&mut self, line: &str) -> String {
        self.send_line(line);
        self.read_reply()
    }

    /// Whether the server closed the connection (EOF with nothing left to read).
    pub fn is_closed(&mut self) -> bool {
        let mut rest = String::new();
        matches!(self.reader.read_line(&mut rest), Ok(0))
    }
}
