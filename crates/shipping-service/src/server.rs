//! HTTP server for the shipping API.

use crate::apis::order::{get_order_by_id, ApiError};
use axum::{
	extract::{Path, State},
	response::Json,
	routing::get,
	Router,
};
use shipping_client::OrderServiceClient;
use shipping_config::ApiConfig;
use shipping_types::OrderDto;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Identifier of this shipping instance.
	pub shipping_id: String,
	/// Client used to read orders from the order service.
	pub orders: OrderServiceClient,
}

/// Builds the router with the `/api` routes and middleware.
pub fn router(state: AppState) -> Router {
	Router::new()
		.nest(
			"/api",
			Router::new().route("/orders/{id}", get(handle_get_order_by_id)),
		)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(CorsLayer::permissive()),
		)
		.with_state(state)
}

/// Binds the configured address and serves the API until the server stops.
pub async fn start_server(
	api_config: ApiConfig,
	state: AppState,
) -> Result<(), Box<dyn std::error::Error>> {
	let shipping_id = state.shipping_id.clone();
	let app = router(state);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Shipping API [{}] listening on {}", shipping_id, bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Handles GET /api/orders/{id} requests.
async fn handle_get_order_by_id(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<OrderDto>, ApiError> {
	match get_order_by_id(&id, &state.orders).await {
		Ok(order) => Ok(Json(order)),
		Err(e) => {
			tracing::warn!("Order retrieval failed: {}", e);
			Err(e)
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::apis::order::ErrorResponse;
	use axum::body::{to_bytes, Body};
	use axum::http::{Request, StatusCode};
	use shipping_client::implementations::mock::{
		request_to, with_json, with_server_error, with_status, MockTransport,
	};
	use shipping_client::RestClient;
	use shipping_types::OrderStatus;
	use std::sync::Arc;
	use tower::ServiceExt;

	const ORDERS: &str = "http://order-service/order-service/api/orders";

	fn app(mock: &MockTransport) -> Router {
		router(AppState {
			shipping_id: "shipping-test".to_string(),
			orders: OrderServiceClient::new(RestClient::new(Arc::new(mock.clone())), ORDERS),
		})
	}

	async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
		let response = app
			.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
			.await
			.unwrap();
		let status = response.status();
		let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		(status, body.to_vec())
	}

	#[tokio::test]
	async fn test_get_order_proxies_order_service() {
		let mock = MockTransport::new();
		mock.expect(request_to(format!("{}/1", ORDERS)))
			.and_respond(with_json(serde_json::json!({
				"orderId": 1,
				"orderStatus": "ORDERED",
				"orderFee": 100.0,
				"orderDesc": "ignored"
			})));

		let (status, body) = get(app(&mock), "/api/orders/1").await;

		assert_eq!(status, StatusCode::OK);
		let order: OrderDto = serde_json::from_slice(&body).unwrap();
		assert_eq!(order, OrderDto::new(1, OrderStatus::Ordered, 100.0));
		mock.verify().unwrap();
	}

	#[tokio::test]
	async fn test_upstream_server_error_is_bad_gateway() {
		let mock = MockTransport::new();
		mock.expect(request_to(format!("{}/999", ORDERS)))
			.and_respond(with_server_error());

		let (status, body) = get(app(&mock), "/api/orders/999").await;

		assert_eq!(status, StatusCode::BAD_GATEWAY);
		let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
		assert_eq!(error.error, "ORDER_SERVICE_ERROR");
		mock.verify().unwrap();
	}

	#[tokio::test]
	async fn test_upstream_not_found() {
		let mock = MockTransport::new();
		mock.expect(request_to(format!("{}/7", ORDERS)))
			.and_respond(with_status(StatusCode::NOT_FOUND));

		let (status, _) = get(app(&mock), "/api/orders/7").await;
		assert_eq!(status, StatusCode::NOT_FOUND);
	}

	#[tokio::test]
	async fn test_invalid_id_never_reaches_order_service() {
		let mock = MockTransport::new();

		let (status, body) = get(app(&mock), "/api/orders/abc").await;

		assert_eq!(status, StatusCode::BAD_REQUEST);
		let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
		assert_eq!(error.error, "INVALID_ORDER_ID");
		assert!(mock.verify().is_ok());
	}

	#[tokio::test]
	async fn test_unreachable_order_service() {
		let mock = MockTransport::new();

		let (status, body) = get(app(&mock), "/api/orders/3").await;

		assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
		let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
		assert_eq!(error.error, "ORDER_SERVICE_UNAVAILABLE");
	}
}
