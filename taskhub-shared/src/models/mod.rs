/// Database models and data structures
///
/// - `user`: user accounts, roles, and the public (hash-free) view
/// - `task`: tasks, task status, and listings with resolved user relations

pub mod task;
pub mod user;
