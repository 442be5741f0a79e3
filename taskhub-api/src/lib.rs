//! # Taskhub API Server Library
//!
//! This library provides the core functionality for the Taskhub API server:
//! a multi-user task collaboration backend with per-user listing caching,
//! real-time WebSocket notifications, and an append-only audit trail.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `notify`: Notification capability and the WebSocket session hub
//! - `routes`: API route handlers
//! - `tasks`: Task policy and mutation service

pub mod app;
pub mod config;
pub mod error;
pub mod notify;
pub mod routes;
pub mod tasks;
