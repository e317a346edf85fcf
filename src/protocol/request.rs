//! Parsed representation of one inbound exchange.

use std::collections::HashMap;

use crate::protocol::Method;

/// A request read from the front-end server.
///
/// Owned by the worker that read it and dropped once the response is sent.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    route: String,
    /// Raw SCGI/CGI variables (`REQUEST_METHOD`, `HTTP_HOST`, ...).
    vars: HashMap<String, String>,
    /// Decoded query-string and form parameters, first occurrence wins.
    params: HashMap<String, String>,
    body: Vec<u8>,
}

impl Request {
    /// Build a request by hand; the SCGI reader goes through [`Request::from_vars`].
    pub fn new(method: Method, route: impl Into<String>) -> Self {
        Self {
            method,
            route: route.into(),
            vars: HashMap::new(),
            params: HashMap::new(),
            body: Vec::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.entry(name.into()).or_insert_with(|| value.into());
        self
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Assemble a request from its decoded variables and body.
    ///
    /// Returns `None` when `REQUEST_METHOD` is missing.
    pub(crate) fn from_vars(vars: HashMap<String, String>, body: Vec<u8>) -> Option<Self> {
        let method: Method = match vars.get("REQUEST_METHOD")?.parse() {
            Ok(method) => method,
            Err(never) => match never {},
        };
        let route = route_from_vars(&vars);

        let mut params = HashMap::new();
        if let Some(query) = vars.get("QUERY_STRING") {
            collect_params(&mut params, query.as_bytes());
        }
        let is_form = vars
            .get("CONTENT_TYPE")
            .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
            .unwrap_or(false);
        if is_form {
            collect_params(&mut params, &body);
        }

        Some(Self {
            method,
            route,
            vars,
            params,
            body,
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request path as sent by the front-end, base path included.
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Query-string or form parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// HTTP header by its HTTP name, e.g. `X-Api-Key`.
    pub fn header(&self, name: &str) -> Option<&str> {
        let normalized = name.to_ascii_uppercase().replace('-', "_");
        let var = match normalized.as_str() {
            "CONTENT_TYPE" | "CONTENT_LENGTH" => normalized,
            _ => format!("HTTP_{}", normalized),
        };
        self.var(&var)
    }

    /// Raw SCGI variable.
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

fn route_from_vars(vars: &HashMap<String, String>) -> String {
    if let Some(uri) = vars.get("DOCUMENT_URI") {
        return uri.clone();
    }
    if let Some(uri) = vars.get("REQUEST_URI") {
        return uri.split('?').next().unwrap_or_default().to_string();
    }
    let script = vars.get("SCRIPT_NAME").map(String::as_str).unwrap_or_default();
    let info = vars.get("PATH_INFO").map(String::as_str).unwrap_or_default();
    format!("{}{}", script, info)
}

fn collect_params(params: &mut HashMap<String, String>, input: &[u8]) {
    for (name, value) in url::form_urlencoded::parse(input) {
        params
            .entry(name.into_owned())
            .or_insert_with(|| value.into_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_route_sources() {
        let doc = vars(&[("REQUEST_METHOD", "GET"), ("DOCUMENT_URI", "/app/ping"), ("REQUEST_URI", "/other")]);
        assert_eq!(Request::from_vars(doc, Vec::new()).unwrap().route(), "/app/ping");

        let uri = vars(&[("REQUEST_METHOD", "GET"), ("REQUEST_URI", "/ping?x=1")]);
        assert_eq!(Request::from_vars(uri, Vec::new()).unwrap().route(), "/ping");

        let cgi = vars(&[("REQUEST_METHOD", "GET"), ("SCRIPT_NAME", "/app"), ("PATH_INFO", "/ping")]);
        assert_eq!(Request::from_vars(cgi, Vec::new()).unwrap().route(), "/app/ping");
    }

    #[test]
    fn test_missing_method() {
        assert!(Request::from_vars(vars(&[("DOCUMENT_URI", "/")]), Vec::new()).is_none());
    }

    #[test]
    fn test_query_then_form_params() {
        let v = vars(&[
            ("REQUEST_METHOD", "POST"),
            ("DOCUMENT_URI", "/login"),
            ("QUERY_STRING", "user=query&lang=pt%20BR"),
            ("CONTENT_TYPE", "application/x-www-form-urlencoded; charset=utf-8"),
        ]);
        let req = Request::from_vars(v, b"user=form&token=abc".to_vec()).unwrap();

        assert_eq!(req.method(), &Method::Post);
        assert_eq!(req.param("user"), Some("query"));
        assert_eq!(req.param("lang"), Some("pt BR"));
        assert_eq!(req.param("token"), Some("abc"));
        assert_eq!(req.param("absent"), None);
    }

    #[test]
    fn test_body_not_parsed_without_form_type() {
        let v = vars(&[("REQUEST_METHOD", "POST"), ("DOCUMENT_URI", "/"), ("CONTENT_TYPE", "application/json")]);
        let req = Request::from_vars(v, b"a=b".to_vec()).unwrap();
        assert_eq!(req.param("a"), None);
        assert_eq!(req.body(), b"a=b");
    }

    #[test]
    fn test_header_lookup() {
        let req = Request::new(Method::Get, "/")
            .with_var("HTTP_X_API_KEY", "secret")
            .with_var("CONTENT_TYPE", "text/plain");

        assert_eq!(req.header("X-Api-Key"), Some("secret"));
        assert_eq!(req.header("content-type"), Some("text/plain"));
        assert_eq!(req.header("Host"), None);
    }
}
