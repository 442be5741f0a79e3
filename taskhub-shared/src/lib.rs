//! # Taskhub Shared Library
//!
//! This crate contains the types and infrastructure shared by the Taskhub
//! API server and its tests.
//!
//! ## Module Organization
//!
//! - `models`: Database models (users, tasks) and their query operations
//! - `auth`: JWT and password primitives plus the authenticated `Actor`
//! - `db`: PostgreSQL pool creation and migration runner
//! - `redis`: Redis client wrapper (connection manager + health check)
//! - `cache`: Per-user task-listing cache backed by Redis
//! - `audit`: Append-only audit sink for task lifecycle events

pub mod audit;
pub mod auth;
pub mod cache;
pub mod db;
pub mod models;
pub mod redis;

/// Current version of the Taskhub shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
