//! API handlers for the shipping service.

pub mod order;
