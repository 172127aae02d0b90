//! Typed JSON requests over a [`TransportInterface`].

use crate::{TransportError, TransportInterface};
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use shipping_types::{HttpRequest, HttpResponse, OrderValidationError};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors returned by [`RestClient`] and the clients built on it.
#[derive(Debug, Error)]
pub enum ClientError {
	/// The transport failed to deliver the request.
	#[error("Transport error: {0}")]
	Transport(#[from] TransportError),
	/// The remote side answered with a non-2xx status.
	#[error("{url} responded with {status}: {body}")]
	Status {
		url: String,
		status: StatusCode,
		body: String,
	},
	/// The body of a 2xx response was not the expected JSON.
	#[error("Failed to decode response from {url}: {message}")]
	Decode { url: String, message: String },
	/// The decoded record violates its invariants.
	#[error("Invalid payload: {0}")]
	InvalidPayload(#[from] OrderValidationError),
	/// A configured header name or value is not valid HTTP.
	#[error("Invalid header '{0}'")]
	InvalidHeader(String),
}

impl ClientError {
	/// Returns the response status for [`ClientError::Status`].
	pub fn status(&self) -> Option<StatusCode> {
		match self {
			ClientError::Status { status, .. } => Some(*status),
			_ => None,
		}
	}
}

/// Client for JSON resources reachable through a transport.
#[derive(Clone)]
pub struct RestClient {
	transport: Arc<dyn TransportInterface>,
	/// Headers added to every request, overriding per-request values.
	default_headers: HeaderMap,
}

impl RestClient {
	pub fn new(transport: Arc<dyn TransportInterface>) -> Self {
		Self {
			transport,
			default_headers: HeaderMap::new(),
		}
	}

	/// Adds headers sent with every request.
	pub fn with_default_headers(
		mut self,
		headers: &HashMap<String, String>,
	) -> Result<Self, ClientError> {
		for (name, value) in headers {
			let header_name = HeaderName::from_bytes(name.as_bytes())
				.map_err(|_| ClientError::InvalidHeader(name.clone()))?;
			let header_value =
				HeaderValue::from_str(value).map_err(|_| ClientError::InvalidHeader(name.clone()))?;
			self.default_headers.insert(header_name, header_value);
		}
		Ok(self)
	}

	/// Performs a GET on `url` and decodes the JSON body of a 2xx response into `T`.
	pub async fn get_for_object<T: DeserializeOwned>(&self, url: &str) -> Result<T, ClientError> {
		let response = self.exchange(HttpRequest::get(url)).await?;
		serde_json::from_slice(&response.body).map_err(|e| ClientError::Decode {
			url: url.to_string(),
			message: e.to_string(),
		})
	}

	/// Performs a GET on `url` and returns the JSON body undecoded.
	pub async fn get_for_json(&self, url: &str) -> Result<serde_json::Value, ClientError> {
		self.get_for_object(url).await
	}

	/// Sends a request and fails on any non-2xx status.
	pub async fn exchange(&self, mut request: HttpRequest) -> Result<HttpResponse, ClientError> {
		for (name, value) in &self.default_headers {
			request.headers.insert(name.clone(), value.clone());
		}

		let url = request.url.clone();
		let method = request.method.clone();
		let response = self.transport.send(request).await?;
		debug!(%method, %url, status = %response.status, "Received response");

		if !response.is_success() {
			return Err(ClientError::Status {
				url,
				status: response.status,
				body: response.text(),
			});
		}
		Ok(response)
	}
}
