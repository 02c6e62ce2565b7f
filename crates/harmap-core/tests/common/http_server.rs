//! Minimal HTTP/1.1 server for verification integration tests.
//!
//! Routes by path prefix:
//! - `/status/{code}` answers with that status and a short JSON body.
//! - `/slow` waits 3 seconds before answering 200.
//! - `/echo-cookie` answers 200 with the request's Cookie header as the body.
//! - anything else answers 200 with `{"ok":true}`.
//!
//! Every request line is recorded, in arrival order, with its arrival time.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub target: String,
    pub at: Instant,
}

#[derive(Clone, Default)]
pub struct RequestLog(Arc<Mutex<Vec<SeenRequest>>>);

impl RequestLog {
    pub fn snapshot(&self) -> Vec<SeenRequest> {
        self.0.lock().unwrap().clone()
    }
}

/// Starts a server in a background thread. Returns the origin
/// (e.g. "http://127.0.0.1:12345") and the request log.
pub fn start() -> (String, RequestLog) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let log = RequestLog::default();
    let server_log = log.clone();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let log = server_log.clone();
            thread::spawn(move || handle(stream, &log));
        }
    });
    (format!("http://127.0.0.1:{}", port), log)
}

fn handle(mut stream: std::net::TcpStream, log: &RequestLog) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, target, cookie) = parse_request(request);
    log.0.lock().unwrap().push(SeenRequest {
        method: method.to_string(),
        target: target.to_string(),
        at: Instant::now(),
    });

    let path = target.split('?').next().unwrap_or("");
    let (status, body) = if let Some(code) = path.strip_prefix("/status/") {
        let code = code.parse::<u16>().unwrap_or(200);
        (code, format!("{{\"status\":{}}}", code))
    } else if path == "/slow" {
        thread::sleep(Duration::from_secs(3));
        (200, "{\"slow\":true}".to_string())
    } else if path == "/echo-cookie" {
        (200, cookie.unwrap_or("").to_string())
    } else {
        (200, "{\"ok\":true}".to_string())
    };

    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        reason(status),
        body.len()
    );
    let _ = stream.write_all(response.as_bytes());
    if !method.eq_ignore_ascii_case("HEAD") {
        let _ = stream.write_all(body.as_bytes());
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

/// Returns (method, request target, Cookie header).
fn parse_request(request: &str) -> (&str, &str, Option<&str>) {
    let mut method = "";
    let mut target = "";
    let mut cookie = None;
    for (i, line) in request.lines().enumerate() {
        let line = line.trim();
        if i == 0 {
            let mut parts = line.split_whitespace();
            method = parts.next().unwrap_or("");
            target = parts.next().unwrap_or("");
            continue;
        }
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("cookie") {
                cookie = Some(value.trim());
            }
        }
    }
    (method, target, cookie)
}
