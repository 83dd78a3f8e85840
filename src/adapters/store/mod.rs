//! Storage backends
//!
//! The [`traits::CommerceStore`] trait carries the persistence contract the
//! pipeline depends on; PostgreSQL is the production backend and the
//! in-memory store backs tests and dry runs.

pub mod factory;
pub mod memory;
pub mod postgres;
pub mod traits;

pub use factory::create_store;
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use traits::{CommerceStore, CustomerWithOrders};
