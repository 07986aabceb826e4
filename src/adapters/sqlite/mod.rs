//! SQLite persistence adapters.

pub mod case_store;
pub mod connection;
pub mod migrations;
pub mod order_gateway;

pub use case_store::SqliteCaseStore;
pub use connection::{create_pool, create_test_pool, ConnectionError, PoolConfig};
pub use migrations::{all_embedded_migrations, initial_schema_migration, Migration, Migrator};
pub use order_gateway::SqliteOrderGateway;
