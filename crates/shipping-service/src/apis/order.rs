//! Order lookup endpoint.
//!
//! Shipping exposes the orders it ships through its own API by reading them
//! from the order service. Upstream failures are translated into gateway-style
//! statuses so callers can tell a missing order from an unreachable service.

use axum::{
	http::StatusCode,
	response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use shipping_client::{ClientError, OrderServiceClient};
use shipping_types::OrderDto;
use thiserror::Error;
use tracing::info;

/// Errors that can occur while serving an order lookup.
#[derive(Debug, Error)]
pub enum ApiError {
	#[error("Invalid order ID format: {0}")]
	InvalidId(String),
	#[error(transparent)]
	Client(#[from] ClientError),
}

/// JSON error body returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Machine-readable error code.
	pub error: String,
	/// Human-readable description.
	pub message: String,
}

impl ApiError {
	/// Status code and error code for this error.
	pub fn classify(&self) -> (StatusCode, &'static str) {
		match self {
			ApiError::InvalidId(_) => (StatusCode::BAD_REQUEST, "INVALID_ORDER_ID"),
			ApiError::Client(ClientError::Status { status, .. })
				if *status == StatusCode::NOT_FOUND =>
			{
				(StatusCode::NOT_FOUND, "ORDER_NOT_FOUND")
			},
			ApiError::Client(ClientError::Status { .. }) => {
				(StatusCode::BAD_GATEWAY, "ORDER_SERVICE_ERROR")
			},
			ApiError::Client(ClientError::Transport(_)) => {
				(StatusCode::SERVICE_UNAVAILABLE, "ORDER_SERVICE_UNAVAILABLE")
			},
			ApiError::Client(ClientError::Decode { .. })
			| ApiError::Client(ClientError::InvalidPayload(_)) => {
				(StatusCode::BAD_GATEWAY, "INVALID_ORDER_PAYLOAD")
			},
			ApiError::Client(ClientError::InvalidHeader(_)) => {
				(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let (status, code) = self.classify();
		let body = ErrorResponse {
			error: code.to_string(),
			message: self.to_string(),
		};
		(status, Json(body)).into_response()
	}
}

/// Handles GET /api/orders/{id}.
pub async fn get_order_by_id(
	id: &str,
	client: &OrderServiceClient,
) -> Result<OrderDto, ApiError> {
	info!("Retrieving order with ID: {}", id);

	let order_id = validate_order_id(id)?;
	Ok(client.fetch_order(order_id).await?)
}

/// Order IDs are the order service's integer identifiers.
fn validate_order_id(id: &str) -> Result<i32, ApiError> {
	id.parse::<i32>()
		.map_err(|_| ApiError::InvalidId(format!("Order ID must be an integer: {}", id)))
}

#[cfg(test)]
mod tests {
	use super::*;
	use shipping_client::TransportError;

	#[test]
	fn test_validate_order_id() {
		assert_eq!(validate_order_id("42").unwrap(), 42);
		assert!(matches!(
			validate_order_id("abc"),
			Err(ApiError::InvalidId(_))
		));
		assert!(validate_order_id("99999999999").is_err());
	}

	#[test]
	fn test_error_classification() {
		let cases = [
			(
				ApiError::Client(ClientError::Status {
					url: "u".into(),
					status: StatusCode::NOT_FOUND,
					body: String::new(),
				}),
				StatusCode::NOT_FOUND,
			),
			(
				ApiError::Client(ClientError::Status {
					url: "u".into(),
					status: StatusCode::INTERNAL_SERVER_ERROR,
					body: String::new(),
				}),
				StatusCode::BAD_GATEWAY,
			),
			(
				ApiError::Client(ClientError::Transport(TransportError::Network(
					"refused".into(),
				))),
				StatusCode::SERVICE_UNAVAILABLE,
			),
			(
				ApiError::Client(ClientError::Decode {
					url: "u".into(),
					message: "eof".into(),
				}),
				StatusCode::BAD_GATEWAY,
			),
			(ApiError::InvalidId("x".into()), StatusCode::BAD_REQUEST),
		];

		for (error, expected) in cases {
			assert_eq!(error.classify().0, expected, "{}", error);
		}
	}
}
