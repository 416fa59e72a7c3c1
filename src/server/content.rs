//! Content negotiation helpers.
//!
//! These write a serialized value into a [`ResponseWriter`] with matching
//! `Content-Type` and `Content-Length` headers. A serialization failure is
//! answered with `500 Internal Server Error` and the error text as the body.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::parser::HttpRequest;
use crate::server::error::Error;
use crate::server::response::StatusCode;
use crate::server::writer::ResponseWriter;

/// Serialize `value` as indented JSON.
pub fn send_json<T: Serialize + ?Sized>(w: &ResponseWriter, value: &T) {
    match serde_json::to_vec_pretty(value) {
        Ok(content) => write_body(w, "application/json", &content),
        Err(e) => w.error(StatusCode::InternalServerError, &e.to_string()),
    }
}

/// Serialize `value` as XML.
pub fn send_xml<T: Serialize + ?Sized>(w: &ResponseWriter, value: &T) {
    match quick_xml::se::to_string(value) {
        Ok(content) => write_body(w, "text/xml; charset=utf-8", content.as_bytes()),
        Err(e) => w.error(StatusCode::InternalServerError, &e.to_string()),
    }
}

/// Serialize `value` in the format the request's `Accept` header asks for.
///
/// `application/xml` and `text/xml` get XML; anything else gets JSON.
pub fn send<T: Serialize + ?Sized>(req: &HttpRequest, w: &ResponseWriter, value: &T) {
    if req.accepts("application/xml") || req.accepts("text/xml") {
        send_xml(w, value);
    } else {
        send_json(w, value);
    }
}

/// Decode a JSON request body.
pub fn read_json<T: DeserializeOwned>(req: &HttpRequest) -> Result<T, Error> {
    Ok(serde_json::from_slice(&req.body)?)
}

/// Decode an XML request body.
pub fn read_xml<T: DeserializeOwned>(req: &HttpRequest) -> Result<T, Error> {
    let text = std::str::from_utf8(&req.body).map_err(|e| Error::XmlError(e.to_string()))?;
    quick_xml::de::from_str(text).map_err(|e| Error::XmlError(e.to_string()))
}

fn write_body(w: &ResponseWriter, content_type: &str, content: &[u8]) {
    w.set_header("Content-Length", content.len().to_string());
    w.set_header("Content-Type", content_type);
    w.write(content);
}
