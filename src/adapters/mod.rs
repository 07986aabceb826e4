//! Adapter implementations of the domain ports.

pub mod http;
pub mod mock;
pub mod sqlite;
