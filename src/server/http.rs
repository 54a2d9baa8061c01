//! Minimal HTTP/1.1 request reading and response writing over tokio streams.

use serde::Serialize;
use std::collections::HashMap;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Upper bound on a request (headers + body).
pub const MAX_REQUEST_BYTES: usize = 1_000_000;

#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn parse(raw: &[u8]) -> Option<Self> {
        let headers_end = find_headers_end(raw)?;
        let head = std::str::from_utf8(&raw[..headers_end]).ok()?;
        let mut lines = head.split("\r\n");

        let mut parts = lines.next()?.split_whitespace();
        let method = parts.next()?.to_uppercase();
        let target = parts.next()?;

        let (raw_path, query_string) = match target.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (target, None),
        };

        // Normalize path (remove trailing slash except for root)
        let mut path = raw_path.trim_end_matches('/').to_string();
        if path.is_empty() {
            path = "/".to_string();
        }

        let headers = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_string()))
            .collect();

        Some(Self {
            method,
            path,
            query: query_string.map(parse_query).unwrap_or_default(),
            headers,
            body: raw[headers_end + 4..].to_vec(),
        })
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Path split into non-empty, percent-decoded segments.
    pub fn segments(&self) -> Vec<String> {
        self.path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(decode_component)
            .collect()
    }
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (decode_component(k), decode_component(&v.replace('+', " "))),
            None => (decode_component(pair), String::new()),
        })
        .collect()
}

/// Percent-decode; invalid UTF-8 keeps the raw text.
fn decode_component(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

fn find_headers_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n")
}

fn content_length(head: &[u8]) -> Option<usize> {
    let head = std::str::from_utf8(head).ok()?;
    head.split("\r\n").find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

/// Read one request: headers, then `Content-Length` bytes of body.
/// Returns `None` if the peer closed before sending anything.
pub async fn read_request<R: AsyncRead + Unpin>(reader: &mut R) -> std::io::Result<Option<Vec<u8>>> {
    let mut buffer = Vec::new();
    let mut temp_buf = [0u8; 8192];

    loop {
        let n = reader.read(&mut temp_buf).await?;
        if n == 0 {
            break; // EOF
        }
        buffer.extend_from_slice(&temp_buf[..n]);

        if let Some(headers_end) = find_headers_end(&buffer) {
            let body_len = content_length(&buffer[..headers_end]).unwrap_or(0);
            let expected = (headers_end + 4)
                .checked_add(body_len)
                .filter(|total| *total <= MAX_REQUEST_BYTES)
                .ok_or_else(too_large)?;
            if buffer.len() >= expected {
                buffer.truncate(expected);
                break;
            }
        }

        if buffer.len() > MAX_REQUEST_BYTES {
            return Err(too_large());
        }
    }

    Ok(if buffer.is_empty() { None } else { Some(buffer) })
}

/// Reported as `413 Payload Too Large` by the connection handler.
fn too_large() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, "request too large")
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn json<T: Serialize + ?Sized>(status: u16, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self::raw(status, "application/json", body),
            Err(_) => Self::raw(
                500,
                "application/json",
                br#"{"error":"Failed to serialize response","code":"json_error"}"#.to_vec(),
            ),
        }
    }

    pub fn error(status: u16, message: &str, code: &str) -> Self {
        Self::json(status, &serde_json::json!({ "error": message, "code": code }))
    }

    pub fn error_with_details(status: u16, message: &str, code: &str, details: &str) -> Self {
        Self::json(
            status,
            &serde_json::json!({ "error": message, "code": code, "details": details }),
        )
    }

    pub fn raw(status: u16, content_type: &str, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type: content_type.to_string(),
            headers: Vec::new(),
            body,
        }
    }

    pub fn no_content() -> Self {
        Self::raw(204, "text/plain", Vec::new())
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut head = format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: {}\r\n\
             Access-Control-Allow-Origin: *\r\n\
             Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
             Access-Control-Allow-Headers: Content-Type\r\n\
             Connection: close\r\n\
             Content-Length: {}\r\n",
            self.status,
            status_text(self.status),
            self.content_type,
            self.body.len()
        );
        for (name, value) in &self.headers {
            head.push_str(&format!("{}: {}\r\n", name, value));
        }
        head.push_str("\r\n");

        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        _ => "Internal Server Error",
    }
}
