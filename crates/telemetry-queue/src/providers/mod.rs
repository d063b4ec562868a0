//! Broker implementations.
//!
//! Concrete implementations of the [`crate::broker::Broker`] trait: an
//! in-process one for tests and single-machine runs, and a Redis-backed one
//! for production deployments spanning a server and one or more aggregators.

pub mod memory;
pub mod redis;

pub use memory::MemoryBroker;
pub use redis::RedisBroker;
