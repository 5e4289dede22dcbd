//! One-shot loopback HTTP server for client tests.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};

/// What the server received: request line, header lines and body.
pub struct Received {
    pub request_line: String,
    pub headers: Vec<String>,
    pub body: String,
}

impl Received {
    pub fn has_header(&self, line: &str) -> bool {
        self.headers.iter().any(|h| h.eq_ignore_ascii_case(line))
    }
}

/// Answers a single request with `status` and a JSON `body`. Returns the base
/// URL (`http://127.0.0.1:<port>`) and a handle yielding the request.
pub fn serve_once(status: u16, body: &'static str) -> (String, JoinHandle<Received>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();
        let mut headers = Vec::new();
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end().to_string();
            if line.is_empty() {
                break;
            }
            headers.push(line);
        }
        let length = headers
            .iter()
            .filter_map(|h| h.split_once(':'))
            .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        let mut body_buf = vec![0u8; length];
        reader.read_exact(&mut body_buf).unwrap();

        let reason = if status < 300 { "OK" } else { "Error" };
        let response = format!(
            "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).unwrap();
        Received {
            request_line: request_line.trim_end().to_string(),
            headers,
            body: String::from_utf8_lossy(&body_buf).to_string(),
        }
    });
    (format!("http://{addr}"), handle)
}
