/// Task mutation and real-time notification pipeline
///
/// This is the heart of the system: it applies authorization rules to task
/// creation/update/deletion, decides who must be notified, keeps the
/// per-user listing cache coherent for the acting user, and emits ordered
/// real-time events to the right audience.
///
/// - `policy`: pure decision logic (assignment, authorization, fan-out
///   plans) with no I/O, unit-tested exhaustively
/// - `service`: the orchestrator wiring storage, cache, audit, and the
///   notifier around those decisions

pub mod policy;
pub mod service;

pub use service::{CreateTaskInput, TaskService};
