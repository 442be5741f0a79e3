/// Redis infrastructure
///
/// Taskhub uses Redis for two concerns:
/// - the per-user task-listing cache (see [`crate::cache`])
/// - the append-only audit stream (see [`crate::audit`])
///
/// Both are built on the shared [`client::RedisClient`] wrapper.

pub mod client;

pub use client::{RedisClient, RedisClientError, RedisConfig};
