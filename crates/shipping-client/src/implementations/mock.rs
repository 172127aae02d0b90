//! In-memory mock transport.
//!
//! Requests are answered from a list of expectations registered up front. Each
//! expectation pairs a [`RequestMatcher`] with a [`MockResponse`] and is consumed
//! by the first request it matches. [`MockTransport::verify`] then checks that
//! every expectation was consumed and that no request went unanswered.
//!
//! ```ignore
//! let mock = MockTransport::new();
//! mock.expect(request_to("http://orders/1"))
//!     .and_respond(with_success(r#"{"orderId":1}"#, "application/json"));
//! // ... exercise code holding `Arc::new(mock.clone())` ...
//! mock.verify()?;
//! ```

use crate::{TransportError, TransportFactory, TransportInterface, TransportRegistry};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::HeaderValue;
use http::{Method, StatusCode};
use serde::Deserialize;
use shipping_types::{
	ConfigSchema, Field, FieldType, HttpRequest, HttpResponse, ImplementationRegistry, Schema,
	ValidationError, APPLICATION_JSON,
};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, warn};

/// Raised by [`MockTransport::verify`] when expectations were not met.
#[derive(Debug, Error, Clone, PartialEq)]
#[error(
	"{} expectation(s) not satisfied {:?}, {} unexpected request(s) {:?}",
	.pending.len(),
	.pending,
	.unexpected.len(),
	.unexpected
)]
pub struct VerificationError {
	/// Expectations that never saw a matching request.
	pub pending: Vec<String>,
	/// Requests that arrived when no pending expectation matched.
	pub unexpected: Vec<String>,
}

/// Predicate over outgoing requests.
///
/// The URL must match exactly; method and headers are checked only when set.
#[derive(Debug, Clone)]
pub struct RequestMatcher {
	url: String,
	method: Option<Method>,
	headers: Vec<(String, String)>,
}

/// Matches requests sent to exactly `url`.
pub fn request_to(url: impl Into<String>) -> RequestMatcher {
	RequestMatcher {
		url: url.into(),
		method: None,
		headers: Vec::new(),
	}
}

impl RequestMatcher {
	/// Also require the given method.
	pub fn method(mut self, method: Method) -> Self {
		self.method = Some(method);
		self
	}

	/// Also require a header with the given value. Names are case-insensitive.
	pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
		self.headers
			.push((name.as_ref().to_ascii_lowercase(), value.into()));
		self
	}

	pub fn matches(&self, request: &HttpRequest) -> bool {
		request.url == self.url
			&& self.method.as_ref().is_none_or(|m| *m == request.method)
			&& self
				.headers
				.iter()
				.all(|(name, value)| request.header(name) == Some(value.as_str()))
	}
}

impl fmt::Display for RequestMatcher {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.method {
			Some(method) => write!(f, "{} {}", method, self.url)?,
			None => write!(f, "* {}", self.url)?,
		}
		for (name, value) in &self.headers {
			write!(f, " [{}: {}]", name, value)?;
		}
		Ok(())
	}
}

/// Canned outcome returned for a matched request.
#[derive(Debug, Clone)]
pub enum MockResponse {
	/// Answer with a status, optional content type and body.
	Reply {
		status: StatusCode,
		content_type: Option<String>,
		body: Bytes,
	},
	/// Fail the request as if the network had failed.
	Fail(String),
}

/// 200 with the given body and content type.
pub fn with_success(body: impl Into<Bytes>, content_type: &str) -> MockResponse {
	MockResponse::Reply {
		status: StatusCode::OK,
		content_type: Some(content_type.to_string()),
		body: body.into(),
	}
}

/// 200 with a JSON body.
pub fn with_json(value: serde_json::Value) -> MockResponse {
	with_success(value.to_string(), APPLICATION_JSON)
}

/// The given status with an empty body.
pub fn with_status(status: StatusCode) -> MockResponse {
	MockResponse::Reply {
		status,
		content_type: None,
		body: Bytes::new(),
	}
}

/// 500 Internal Server Error.
pub fn with_server_error() -> MockResponse {
	with_status(StatusCode::INTERNAL_SERVER_ERROR)
}

/// 400 Bad Request.
pub fn with_bad_request() -> MockResponse {
	with_status(StatusCode::BAD_REQUEST)
}

/// A simulated network failure.
pub fn with_transport_failure(message: impl Into<String>) -> MockResponse {
	MockResponse::Fail(message.into())
}

impl MockResponse {
	fn to_result(&self) -> Result<HttpResponse, TransportError> {
		match self {
			MockResponse::Reply {
				status,
				content_type,
				body,
			} => {
				let content_type = match content_type.as_deref().map(HeaderValue::from_str) {
					Some(Ok(value)) => Some(value),
					Some(Err(_)) => {
						warn!(?content_type, "Dropping content type that is not a header value");
						None
					},
					None => None,
				};
				Ok(HttpResponse::new(*status, content_type, body.clone()))
			},
			MockResponse::Fail(message) => Err(TransportError::Network(message.clone())),
		}
	}
}

#[derive(Debug)]
struct Expectation {
	matcher: RequestMatcher,
	response: MockResponse,
	satisfied: bool,
}

#[derive(Debug, Default)]
struct MockState {
	expectations: Vec<Expectation>,
	unexpected: Vec<String>,
}

/// Transport that answers from registered expectations.
///
/// Clones share the same expectation list, so a test can keep one handle for
/// [`MockTransport::verify`] while the code under test owns another.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
	state: Arc<Mutex<MockState>>,
}

/// Pending registration returned by [`MockTransport::expect`].
#[must_use = "an expectation is only registered once `and_respond` is called"]
pub struct ExpectationBuilder<'a> {
	transport: &'a MockTransport,
	matcher: RequestMatcher,
}

impl ExpectationBuilder<'_> {
	/// Registers the expectation with the response it answers with.
	pub fn and_respond(self, response: MockResponse) {
		self.transport.lock().expectations.push(Expectation {
			matcher: self.matcher,
			response,
			satisfied: false,
		});
	}
}

impl MockTransport {
	pub fn new() -> Self {
		Self::default()
	}

	/// Starts registering an expectation for requests accepted by `matcher`.
	pub fn expect(&self, matcher: RequestMatcher) -> ExpectationBuilder<'_> {
		ExpectationBuilder {
			transport: self,
			matcher,
		}
	}

	/// Checks that every expectation was consumed and no request went unmatched.
	pub fn verify(&self) -> Result<(), VerificationError> {
		let state = self.lock();
		let pending: Vec<String> = state
			.expectations
			.iter()
			.filter(|e| !e.satisfied)
			.map(|e| e.matcher.to_string())
			.collect();

		if pending.is_empty() && state.unexpected.is_empty() {
			return Ok(());
		}
		Err(VerificationError {
			pending,
			unexpected: state.unexpected.clone(),
		})
	}

	/// Number of expectations not yet consumed.
	pub fn pending_count(&self) -> usize {
		self.lock()
			.expectations
			.iter()
			.filter(|e| !e.satisfied)
			.count()
	}

	/// Drops all expectations and recorded requests.
	pub fn reset(&self) {
		let mut state = self.lock();
		state.expectations.clear();
		state.unexpected.clear();
	}

	/// A panic in a test thread must not hide the expectation list from `verify`.
	fn lock(&self) -> MutexGuard<'_, MockState> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

#[async_trait]
impl TransportInterface for MockTransport {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MockTransportSchema)
	}

	async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
		let mut guard = self.lock();
		let state = &mut *guard;
		let matched = state
			.expectations
			.iter_mut()
			.find(|e| !e.satisfied && e.matcher.matches(&request));

		match matched {
			Some(expectation) => {
				expectation.satisfied = true;
				debug!(matcher = %expectation.matcher, "Mock expectation satisfied");
				expectation.response.to_result()
			},
			None => {
				let description = format!("{} {}", request.method, request.url);
				warn!(request = %description, "Unexpected request to mock transport");
				state.unexpected.push(description.clone());
				Err(TransportError::Unexpected(description))
			},
		}
	}
}

/// One canned exchange declared in configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MockExpectationConfig {
	pub url: String,
	#[serde(default)]
	pub method: Option<String>,
	#[serde(default = "default_status")]
	pub status: u16,
	#[serde(default)]
	pub body: String,
	#[serde(default = "default_content_type")]
	pub content_type: String,
}

fn default_status() -> u16 {
	200
}

fn default_content_type() -> String {
	APPLICATION_JSON.to_string()
}

/// Configuration for the mock transport.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MockTransportConfig {
	#[serde(default)]
	pub expectations: Vec<MockExpectationConfig>,
}

/// Configuration schema for MockTransport.
pub struct MockTransportSchema;

impl ConfigSchema for MockTransportSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let expectation = Schema::new(
			vec![Field::new("url", FieldType::Url)],
			vec![
				Field::new("method", FieldType::String).with_validator(|v| {
					v.as_str()
						.and_then(|m| Method::from_bytes(m.as_bytes()).ok())
						.map(|_| ())
						.ok_or_else(|| "not an HTTP method".to_string())
				}),
				Field::new(
					"status",
					FieldType::Integer {
						min: Some(100),
						max: Some(599),
					},
				),
				Field::new("body", FieldType::String),
				Field::new("content_type", FieldType::String).with_validator(|v| {
					v.as_str()
						.and_then(|ct| HeaderValue::from_str(ct).ok())
						.map(|_| ())
						.ok_or_else(|| "not a valid header value".to_string())
				}),
			],
		);
		let schema = Schema::new(
			vec![],
			vec![Field::new(
				"expectations",
				FieldType::Array(Box::new(FieldType::Table(expectation))),
			)],
		);
		schema.validate(config)
	}
}

impl MockTransport {
	/// Builds a mock pre-loaded with the expectations declared in configuration.
	pub fn from_config(config: &MockTransportConfig) -> Result<Self, TransportError> {
		let transport = Self::new();
		for expectation in &config.expectations {
			let mut matcher = request_to(&expectation.url);
			if let Some(method) = &expectation.method {
				let method = Method::from_bytes(method.as_bytes()).map_err(|_| {
					TransportError::Configuration(format!("Invalid method '{}'", method))
				})?;
				matcher = matcher.method(method);
			}
			let status = StatusCode::from_u16(expectation.status).map_err(|_| {
				TransportError::Configuration(format!("Invalid status {}", expectation.status))
			})?;
			HeaderValue::from_str(&expectation.content_type).map_err(|_| {
				TransportError::Configuration(format!(
					"Invalid content type '{}'",
					expectation.content_type.escape_debug()
				))
			})?;

			transport.expect(matcher).and_respond(MockResponse::Reply {
				status,
				content_type: Some(expectation.content_type.clone()),
				body: Bytes::from(expectation.body.clone()),
			});
		}
		Ok(transport)
	}
}

/// Registry for the mock transport implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "mock";
	type Factory = TransportFactory;

	fn factory() -> Self::Factory {
		|config: &toml::Value| -> Result<Box<dyn TransportInterface>, TransportError> {
			let mock_config: MockTransportConfig = config
				.clone()
				.try_into()
				.map_err(|e| TransportError::Configuration(format!("Invalid mock config: {}", e)))?;

			Ok(Box::new(MockTransport::from_config(&mock_config)?))
		}
	}
}

impl TransportRegistry for Registry {}
