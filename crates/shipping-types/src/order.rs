//! Order types exchanged with the order service.
//!
//! The shipping service only ever reads orders; it never creates or mutates
//! them. The wire shape uses camelCase field names and upper-case status
//! symbols.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised when a decoded order violates its invariants.
#[derive(Debug, Error, PartialEq)]
pub enum OrderValidationError {
	/// The fee is negative, NaN or infinite.
	#[error("Invalid order fee for order {order_id}: {fee}")]
	InvalidFee { order_id: i32, fee: f64 },
	/// The status symbol is not one of the known states.
	#[error("Unknown order status: {0}")]
	UnknownStatus(String),
}

/// Lifecycle state of an order as reported by the order service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
	/// Order has been placed by the customer.
	Ordered,
	/// Order is waiting on payment or stock.
	Pending,
	/// Order has left the warehouse.
	Shipped,
}

impl OrderStatus {
	/// Returns the wire symbol of the status.
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::Ordered => "ORDERED",
			OrderStatus::Pending => "PENDING",
			OrderStatus::Shipped => "SHIPPED",
		}
	}

	/// Returns an iterator over all OrderStatus variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[Self::Ordered, Self::Pending, Self::Shipped].into_iter()
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OrderStatus {
	type Err = OrderValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all()
			.find(|status| status.as_str() == s)
			.ok_or_else(|| OrderValidationError::UnknownStatus(s.to_string()))
	}
}

/// Order record returned by `GET {order-service}/{orderId}`.
///
/// Fields the order service adds beyond these three are ignored on decode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderDto {
	/// Unique identifier assigned by the order service.
	pub order_id: i32,
	/// Current lifecycle state.
	pub order_status: OrderStatus,
	/// Monetary fee charged for the order.
	pub order_fee: f64,
}

impl OrderDto {
	pub fn new(order_id: i32, order_status: OrderStatus, order_fee: f64) -> Self {
		Self {
			order_id,
			order_status,
			order_fee,
		}
	}

	/// Checks the invariants serde cannot express.
	///
	/// The fee must be a finite, non-negative amount.
	pub fn validate(&self) -> Result<(), OrderValidationError> {
		if !self.order_fee.is_finite() || self.order_fee < 0.0 {
			return Err(OrderValidationError::InvalidFee {
				order_id: self.order_id,
				fee: self.order_fee,
			});
		}
		Ok(())
	}
}
