//! Minimal HTTP/1.1 framing: one request per connection, `Connection: close`.

use std::io::{Read, Write};

const MAX_HEADER_BYTES: usize = 64 * 1024;
const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn get(path: &str) -> Self {
        Self {
            method: "GET".to_string(),
            path: path.to_string(),
            body: Vec::new(),
        }
    }

    /// Path without the query string.
    pub fn route_path(&self) -> &str {
        self.path.split('?').next().unwrap_or(&self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, content_type: &str, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type: content_type.to_string(),
            headers: Vec::new(),
            body,
        }
    }

    pub fn json<T: serde::Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self::new(status, "application/json", body),
            Err(err) => {
                log::error!("encode json response: {err}");
                Self::new(
                    500,
                    "application/json",
                    br#"{"error":"internal"}"#.to_vec(),
                )
            }
        }
    }

    pub fn redirect(location: &str) -> Self {
        let mut response = Self::new(302, "text/plain; charset=utf-8", b"Found".to_vec());
        response
            .headers
            .push(("Location".to_string(), location.to_string()));
        response
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        302 => "Found",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

pub fn read_request(stream: &mut impl Read) -> anyhow::Result<HttpRequest> {
    let mut buf = Vec::with_capacity(4096);
    let mut chunk = [0u8; 1024];
    let mut header_end = None;

    while header_end.is_none() {
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        header_end = find_header_end(&buf);
        if header_end.is_none() && buf.len() > MAX_HEADER_BYTES {
            anyhow::bail!("request header too large");
        }
    }

    let header_end = header_end.ok_or_else(|| anyhow::anyhow!("incomplete http request"))?;
    let header_text = String::from_utf8_lossy(&buf[..header_end]);
    let mut lines = header_text.split("\r\n");
    let request_line = lines
        .next()
        .ok_or_else(|| anyhow::anyhow!("missing request line"))?;

    let mut parts = request_line.split_whitespace();
    let method = parts
        .next()
        .ok_or_else(|| anyhow::anyhow!("missing method"))?
        .to_string();
    let path = parts
        .next()
        .ok_or_else(|| anyhow::anyhow!("missing path"))?
        .to_string();

    let content_length = content_length(lines).unwrap_or(0).min(MAX_BODY_BYTES);

    let mut body = buf[(header_end + 4).min(buf.len())..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);

    Ok(HttpRequest { method, path, body })
}

pub fn write_response(
    stream: &mut impl Write,
    response: &HttpResponse,
    include_body: bool,
) -> std::io::Result<()> {
    let mut header = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nCache-Control: no-store\r\nConnection: close\r\n",
        response.status,
        reason_phrase(response.status),
        response.content_type,
        response.body.len()
    );
    for (key, value) in &response.headers {
        header.push_str(key);
        header.push_str(": ");
        header.push_str(value);
        header.push_str("\r\n");
    }
    header.push_str("\r\n");

    stream.write_all(header.as_bytes())?;
    if include_body {
        stream.write_all(&response.body)?;
    }
    stream.flush()
}

/// Splits a raw response into status code and body.
pub fn parse_response(raw: &[u8]) -> anyhow::Result<(u16, Vec<u8>)> {
    let header_end =
        find_header_end(raw).ok_or_else(|| anyhow::anyhow!("incomplete http response"))?;
    let header_text = String::from_utf8_lossy(&raw[..header_end]);
    let mut lines = header_text.split("\r\n");
    let status_line = lines
        .next()
        .ok_or_else(|| anyhow::anyhow!("missing status line"))?;
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| anyhow::anyhow!("malformed status line {status_line:?}"))?;

    let mut body = raw[header_end + 4..].to_vec();
    if let Some(length) = content_length(lines) {
        body.truncate(length);
    }
    Ok((status, body))
}

fn content_length<'a>(lines: impl Iterator<Item = &'a str>) -> Option<usize> {
    for line in lines {
        if let Some((key, value)) = line.split_once(':')
            && key.trim().eq_ignore_ascii_case("content-length")
        {
            return Some(value.trim().parse::<usize>().unwrap_or(0));
        }
    }
    None
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Decodes `%XX` escapes; `None` when the result is not UTF-8.
pub fn percent_decode(path: &str) -> Option<String> {
    let bytes = path.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2]))
        {
            out.push((hi << 4) | lo);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).ok()
}

/// Escapes everything except unreserved characters and `/`.
pub fn percent_encode_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for byte in path.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~' | b'/') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_request_line_and_body() {
        let raw = b"POST /api/x?y=1 HTTP/1.1\r\nHost: a\r\nContent-Length: 5\r\n\r\nhello";
        let req = read_request(&mut &raw[..]).unwrap();
        assert_eq!(req.method, "POST");
        assert_eq!(req.path, "/api/x?y=1");
        assert_eq!(req.route_path(), "/api/x");
        assert_eq!(req.body, b"hello");
    }

    #[test]
    fn incomplete_request_is_an_error() {
        let raw = b"GET / HTTP/1.1\r\nHost: a\r\n";
        assert!(read_request(&mut &raw[..]).is_err());
    }

    #[test]
    fn writes_headers_and_optional_body() {
        let response = HttpResponse::redirect("/");
        let mut out = Vec::new();
        write_response(&mut out, &response, true).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 302 Found\r\n"));
        assert!(text.contains("Location: /\r\n"));
        assert!(text.ends_with("\r\n\r\nFound"));

        let mut head = Vec::new();
        write_response(&mut head, &response, false).unwrap();
        assert!(String::from_utf8(head).unwrap().ends_with("\r\n\r\n"));
    }

    #[test]
    fn parses_written_response() {
        let response = HttpResponse::new(500, "application/json", br#"{"error":"x"}"#.to_vec());
        let mut out = Vec::new();
        write_response(&mut out, &response, true).unwrap();
        let (status, body) = parse_response(&out).unwrap();
        assert_eq!(status, 500);
        assert_eq!(body, br#"{"error":"x"}"#);
    }

    #[test]
    fn percent_decoding_handles_spaces_and_garbage() {
        assert_eq!(percent_decode("/images/1_a%20b.png").unwrap(), "/images/1_a b.png");
        assert_eq!(percent_decode("/100%").unwrap(), "/100%");
        assert_eq!(percent_decode("/%zz").unwrap(), "/%zz");
        assert!(percent_decode("/%ff").is_none());
    }

    #[test]
    fn percent_encoding_keeps_slashes() {
        assert_eq!(percent_encode_path("/images/1_a b.png"), "/images/1_a%20b.png");
    }
}
