//! Client for the order service.
//!
//! Orders live at `{base_url}/{orderId}`; the base URL normally comes from
//! `order_service.base_url` in the configuration.

use crate::{ClientError, RestClient, TransportInterface};
use shipping_config::OrderServiceConfig;
use shipping_types::OrderDto;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Reads orders from the order service.
#[derive(Clone)]
pub struct OrderServiceClient {
	rest: RestClient,
	base_url: String,
}

impl OrderServiceClient {
	pub fn new(rest: RestClient, base_url: impl Into<String>) -> Self {
		let base_url = base_url.into().trim_end_matches('/').to_string();
		Self { rest, base_url }
	}

	/// Builds a client from the `[order_service]` section.
	pub fn from_config(
		config: &OrderServiceConfig,
		transport: Arc<dyn TransportInterface>,
	) -> Result<Self, ClientError> {
		let rest = RestClient::new(transport).with_default_headers(&config.default_headers)?;
		Ok(Self::new(rest, config.base_url.clone()))
	}

	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	/// URL of a single order.
	pub fn order_url(&self, order_id: i32) -> String {
		format!("{}/{}", self.base_url, order_id)
	}

	/// Fetches one order and checks its invariants.
	#[instrument(skip(self))]
	pub async fn fetch_order(&self, order_id: i32) -> Result<OrderDto, ClientError> {
		let url = self.order_url(order_id);

		let result = self.rest.get_for_object::<OrderDto>(&url).await.and_then(|order| {
			order.validate()?;
			Ok(order)
		});

		match &result {
			Ok(order) => debug!(status = %order.order_status, fee = order.order_fee, "Fetched order"),
			Err(e) => warn!("Failed to fetch order: {}", e),
		}
		result
	}
}
