//! HTTP adapters for remote services.

pub mod review_client;

pub use review_client::HttpReviewClient;
