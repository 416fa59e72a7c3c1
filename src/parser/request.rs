//! HTTP request parsing and representation.

use std::collections::HashMap;
use std::str::FromStr;
use serde::de::DeserializeOwned;

use crate::parser::error::Error;
use crate::parser::method::Method;
use crate::parser::query::QueryParams;
use crate::parser::version::HttpVersion;

/// Represents an HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The request path, without the query string
    pub path: String,
    /// The raw query string, without the leading `?`
    pub query: String,
    /// The HTTP version
    pub version: HttpVersion,
    /// The HTTP headers
    pub headers: HashMap<String, String>,
    /// The request body
    pub body: Vec<u8>,
    /// Query parameters, plus any path parameters added by the router
    pub query_params: QueryParams,
}

impl HttpRequest {
    /// Create a new HTTP request.
    ///
    /// # Arguments
    ///
    /// * `method` - The HTTP method
    /// * `target` - The request target, optionally followed by `?query`
    /// * `version` - The HTTP version
    /// * `headers` - The HTTP headers
    ///
    /// # Returns
    ///
    /// A new HTTP request with an empty body
    pub fn new(method: Method, target: impl Into<String>, version: HttpVersion, headers: HashMap<String, String>) -> Self {
        let target = target.into();
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path.to_string(), query.to_string()),
            None => (target, String::new()),
        };
        let query_params = QueryParams::parse(&query);

        Self {
            method,
            path,
            query,
            version,
            headers,
            body: Vec::new(),
            query_params,
        }
    }

    /// Create a new HTTP request with a body.
    pub fn with_body(method: Method, target: impl Into<String>, version: HttpVersion, headers: HashMap<String, String>, body: Vec<u8>) -> Self {
        let mut request = Self::new(method, target, version, headers);
        request.body = body;
        request
    }

    /// Get a header value (case-insensitive).
    pub fn get_header(&self, name: &str) -> Option<&String> {
        self.headers.iter().find_map(|(k, v)| {
            if k.eq_ignore_ascii_case(name) {
                Some(v)
            } else {
                None
            }
        })
    }

    /// Check if a header exists.
    pub fn has_header(&self, name: &str) -> bool {
        self.get_header(name).is_some()
    }

    /// Parse the request body as JSON.
    ///
    /// # Returns
    ///
    /// The parsed JSON value, or an error if the body is not valid JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        if !self.is_json() {
            return Err(Error::MissingHeader("Content-Type: application/json".to_string()));
        }

        let json = serde_json::from_slice(&self.body)?;
        Ok(json)
    }

    /// Check if the request has a JSON body.
    pub fn is_json(&self) -> bool {
        self.content_type_starts_with(&["application/json"])
    }

    /// Parse the request body as XML.
    pub fn xml<T: DeserializeOwned>(&self) -> Result<T, Error> {
        if !self.is_xml() {
            return Err(Error::MissingHeader("Content-Type: application/xml".to_string()));
        }

        let text = std::str::from_utf8(&self.body)
            .map_err(|e| Error::XmlError(e.to_string()))?;
        quick_xml::de::from_str(text).map_err(|e| Error::XmlError(e.to_string()))
    }

    /// Check if the request has an XML body.
    pub fn is_xml(&self) -> bool {
        self.content_type_starts_with(&["application/xml", "text/xml"])
    }

    fn content_type_starts_with(&self, types: &[&str]) -> bool {
        match self.get_header("Content-Type") {
            Some(content_type) => types.iter().any(|t| content_type.starts_with(t)),
            None => false,
        }
    }

    /// Check whether the `Accept` header names the given media type.
    pub fn accepts(&self, media_type: &str) -> bool {
        self.get_header("Accept")
            .map(|accept| {
                accept
                    .split(',')
                    .map(|part| part.split(';').next().unwrap_or("").trim())
                    .any(|part| part.eq_ignore_ascii_case(media_type))
            })
            .unwrap_or(false)
    }

    /// Get the first value of a query or path parameter.
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name)
    }

    /// Get every value of a query or path parameter.
    pub fn get_query_params(&self, name: &str) -> Vec<&str> {
        self.query_params.get_all(name)
    }

    /// Check if a query or path parameter exists.
    pub fn has_query_param(&self, name: &str) -> bool {
        self.query_params.contains(name)
    }
}

/// Parse an HTTP request from a byte slice.
///
/// The head is everything up to the first blank line. Whatever follows is the
/// body, cut to `Content-Length` when the header is present.
///
/// # Arguments
///
/// * `input` - A byte slice containing the HTTP request to parse
///
/// # Returns
///
/// The parsed HTTP request, or an error if the request is invalid
pub fn parse_request(input: &[u8]) -> Result<HttpRequest, Error> {
    let (head, body) = split_head(input);

    let input_str = match std::str::from_utf8(head) {
        Ok(s) => s,
        Err(_) => return Err(Error::MalformedRequestLine("Invalid UTF-8".to_string())),
    };

    let mut lines = input_str.lines();

    let request_line = match lines.next() {
        Some(line) if !line.trim().is_empty() => line,
        _ => return Err(Error::EmptyRequest),
    };

    // Split the request line into method, target, and version
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(Error::MalformedRequestLine(request_line.to_string()));
    }

    let method = Method::from_str(parts[0])?;

    let target = parts[1];
    if target.is_empty() {
        return Err(Error::InvalidPath);
    }

    let version = HttpVersion::from_str(parts[2])?;

    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }

        let Some((name, value)) = line.split_once(':') else {
            return Err(Error::InvalidHeaderFormat);
        };

        headers.insert(name.trim().to_string(), value.trim().to_string());
    }

    if version.requires_host() && !headers.keys().any(|k| k.eq_ignore_ascii_case("Host")) {
        return Err(Error::MissingHeader("Host".to_string()));
    }

    let mut body = body.to_vec();
    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("Content-Length"))
        .map(|(_, v)| v.parse::<usize>().map_err(|_| Error::InvalidHeaderFormat))
        .transpose()?;
    if let Some(len) = content_length {
        body.truncate(len);
    }

    Ok(HttpRequest::with_body(method, target, version, headers, body))
}

/// Split raw request bytes at the first blank line.
fn split_head(input: &[u8]) -> (&[u8], &[u8]) {
    if let Some(pos) = input.windows(4).position(|w| w == b"\r\n\r\n") {
        return (&input[..pos], &input[pos + 4..]);
    }
    if let Some(pos) = input.windows(2).position(|w| w == b"\n\n") {
        return (&input[..pos], &input[pos + 2..]);
    }
    (input, &[])
}
