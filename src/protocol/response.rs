//! Output builder for one exchange.

use std::io::{self, Write};

use crate::protocol::StatusCode;

const DEFAULT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Response accumulated by a handler and flushed once by the worker.
#[derive(Debug, Clone, Default)]
pub struct Response {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Set a header, replacing any value already set under the same name.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(slot) => slot.1 = value,
            None => self.headers.push((name, value)),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Replace the body.
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = body.into();
    }

    /// Serialize and write the response. Consumes it, so it goes out once.
    pub fn send<W: Write>(self, out: &mut W) -> io::Result<()> {
        out.write_all(&self.encode())?;
        out.flush()
    }

    fn encode(&self) -> Vec<u8> {
        let mut head = format!("Status: {}\r\n", self.status);
        if self.header("Content-Type").is_none() {
            head.push_str(&format!("Content-Type: {}\r\n", DEFAULT_CONTENT_TYPE));
        }
        head.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        for (name, value) in &self.headers {
            if name.eq_ignore_ascii_case("Content-Length") || name.eq_ignore_ascii_case("Status") {
                continue;
            }
            head.push_str(&format!("{}: {}\r\n", name, value));
        }
        head.push_str("\r\n");

        let mut encoded = head.into_bytes();
        encoded.extend_from_slice(&self.body);
        encoded
    }
}

/// Appends to the body.
impl Write for Response {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_response_is_ok_and_empty() {
        let mut out = Vec::new();
        Response::new().send(&mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Status: 200 OK\r\n"));
        assert!(text.contains("Content-Length: 0\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_headers_and_body() {
        let mut resp = Response::new();
        resp.set_status(StatusCode::CREATED);
        resp.set_header("Content-Type", "application/json");
        resp.set_header("content-type", "text/html");
        resp.set_header("X-Trace", "1");
        write!(resp, "<p>{}</p>", 42).unwrap();

        let mut out = Vec::new();
        resp.send(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("Status: 201 Created\r\n"));
        assert_eq!(text.matches("Content-Type").count(), 1);
        assert!(text.contains("Content-Type: text/html\r\n"));
        assert!(text.contains("Content-Length: 9\r\n"));
        assert!(text.contains("X-Trace: 1\r\n"));
        assert!(text.ends_with("\r\n\r\n<p>42</p>"));
    }

    #[test]
    fn test_content_length_cannot_be_overridden() {
        let mut resp = Response::new();
        resp.set_header("Content-Length", "999");
        resp.set_body("abc");

        let mut out = Vec::new();
        resp.send(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Content-Length: 3\r\n"));
        assert!(!text.contains("999"));
    }
}
