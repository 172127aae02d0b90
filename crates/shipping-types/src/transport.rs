//! Transport-level request and response values.
//!
//! These are the values passed across the transport seam. They carry `http`
//! crate types so a network-backed transport can convert them without loss,
//! while an in-memory transport can build and inspect them directly.

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, Method, StatusCode};

/// Media type for JSON payloads.
pub const APPLICATION_JSON: &str = "application/json";

/// An outbound HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
	/// The HTTP method.
	pub method: Method,
	/// The fully-qualified URL.
	pub url: String,
	/// Request headers.
	pub headers: HeaderMap,
	/// Optional request body.
	pub body: Option<Bytes>,
}

impl HttpRequest {
	/// Creates a request with the given method and URL and no headers.
	pub fn new(method: Method, url: impl Into<String>) -> Self {
		Self {
			method,
			url: url.into(),
			headers: HeaderMap::new(),
			body: None,
		}
	}

	/// Creates a GET request that accepts a JSON response.
	pub fn get(url: impl Into<String>) -> Self {
		let mut request = Self::new(Method::GET, url);
		request
			.headers
			.insert(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));
		request
	}

	/// Adds or replaces a header.
	pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);
		self
	}

	/// Returns the value of a header as a string, if present and valid UTF-8.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|v| v.to_str().ok())
	}
}

/// An HTTP response as seen by the client.
#[derive(Debug, Clone)]
pub struct HttpResponse {
	/// The HTTP status code.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Response body bytes.
	pub body: Bytes,
}

impl HttpResponse {
	/// Creates a response with a status, an optional content type and a body.
	pub fn new(status: StatusCode, content_type: Option<HeaderValue>, body: Bytes) -> Self {
		let mut headers = HeaderMap::new();
		if let Some(content_type) = content_type {
			headers.insert(CONTENT_TYPE, content_type);
		}
		Self {
			status,
			headers,
			body,
		}
	}

	/// Returns true for 2xx responses.
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Returns the `Content-Type` header, if present.
	pub fn content_type(&self) -> Option<&str> {
		self.headers
			.get(CONTENT_TYPE)
			.and_then(|v| v.to_str().ok())
	}

	/// Returns the body as text, replacing invalid UTF-8 sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}
