//! Shared utilities for integration testing.

use std::io::{Read, Write};

use scgi_gateway::protocol::encode_request;
use scgi_gateway::routing::Handler;
use scgi_gateway::{Context, Request, Response, Route, RouteTable, StatusCode};

/// Send one request the way a front-end server would and read the full reply.
#[allow(dead_code)]
pub fn scgi_exchange<S: Read + Write>(mut conn: S, method: &str, uri: &str, body: &[u8]) -> String {
    let (path, query) = uri.split_once('?').unwrap_or((uri, ""));
    let wire = encode_request(
        &[
            ("SCGI", "1"),
            ("REQUEST_METHOD", method),
            ("REQUEST_URI", uri),
            ("DOCUMENT_URI", path),
            ("QUERY_STRING", query),
            ("CONTENT_TYPE", "application/x-www-form-urlencoded"),
        ],
        body,
    );
    conn.write_all(&wire).unwrap();

    let mut reply = String::new();
    conn.read_to_string(&mut reply).unwrap();
    reply
}

/// Body of a CGI-style reply.
#[allow(dead_code)]
pub fn reply_body(reply: &str) -> &str {
    reply.split_once("\r\n\r\n").map(|(_, body)| body).unwrap_or("")
}

fn ping(_: &Context, _: &Request, resp: &mut Response) {
    resp.set_body("pong");
}

fn echo(_: &Context, req: &Request, resp: &mut Response) {
    let name = req.param("name").unwrap_or("nobody").to_string();
    resp.set_header("Content-Type", "text/html");
    resp.set_body(format!("<p>{name}</p>"));
}

fn secret(_: &Context, _: &Request, resp: &mut Response) {
    resp.set_body("secret");
}

fn unauthorized(_: &Context, _: &Request, resp: &mut Response) {
    resp.set_status(StatusCode::UNAUTHORIZED);
}

fn require_token(_: &Context, req: &Request) -> Option<Handler> {
    match req.param("token") {
        Some("letmein") => None,
        _ => Some(unauthorized),
    }
}

/// Routes used across integration tests.
#[allow(dead_code)]
pub fn demo_routes() -> RouteTable {
    RouteTable::new()
        .route(Route::get("/ping", ping))
        .route(Route::post("/echo", echo))
        .route(Route::get("/secret", secret).with_filter(require_token))
}
