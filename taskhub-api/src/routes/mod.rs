/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Authentication endpoints (register, login)
/// - `tasks`: Task CRUD endpoints
/// - `users`: Profile and admin user management endpoints
/// - `events`: WebSocket upgrade for real-time task events

pub mod auth;
pub mod events;
pub mod health;
pub mod tasks;
pub mod users;
