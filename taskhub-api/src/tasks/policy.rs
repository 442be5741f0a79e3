/// Pure policy decisions for the task pipeline
///
/// Everything here is computed from inputs alone: no storage, no sockets,
/// no clock. The service persists first, then asks this module what side
/// effects to run, and executes the returned plan. That split keeps the
/// authorization and fan-out rules testable without any backend.
///
/// # Rules (summary)
///
/// - Assignment at creation: admins may assign anyone; a regular user's
///   task is always self-assigned no matter what the client sent.
/// - Modification: allowed for admins, the task's creator, and its current
///   assignee, nobody else.
/// - Creation fan-out: every admin learns about every new task; a regular
///   creator is also notified themself; an admin-assigned task additionally
///   notifies the assignee (unless self-assigned).
/// - Update fan-out: a changed assignee is notified individually; every
///   update is broadcast globally. The previous assignee is deliberately
///   not notified (see DESIGN.md).

use crate::notify::{TASK_ASSIGNED, TASK_CREATED, TASK_DELETED, TASK_UPDATED};
use taskhub_shared::auth::Actor;
use taskhub_shared::models::task::Task;
use taskhub_shared::models::user::UserRole;

/// One planned notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emit {
    /// Targeted delivery to one user's sessions
    ToUser {
        /// Recipient user id
        user_id: i64,
        /// Event name
        event: &'static str,
    },

    /// Broadcast to every connected session
    Global {
        /// Event name
        event: &'static str,
    },
}

/// Resolves the assignee for a new task
///
/// Only admins may assign to others; any assignee a non-admin supplies is
/// ignored and the task is self-assigned. An admin who supplies no assignee
/// also self-assigns.
pub fn resolve_assignee(actor: Actor, requested: Option<i64>) -> i64 {
    match actor.role {
        UserRole::Admin => requested.unwrap_or(actor.user_id),
        UserRole::User => actor.user_id,
    }
}

/// Whether the actor may mutate (update/delete) the given task
///
/// True for admins, the creator, and the current assignee.
pub fn can_modify(actor: Actor, task: &Task) -> bool {
    match actor.role {
        UserRole::Admin => true,
        UserRole::User => {
            task.created_by_id == actor.user_id || task.assigned_to_id == Some(actor.user_id)
        }
    }
}

/// Plans the notifications for a freshly created task
///
/// - Admin creator: `taskCreated` to every admin; if the task was assigned
///   to someone other than the actor, `taskAssigned` to that assignee.
/// - Regular creator: `taskCreated` to the actor themself and to every
///   admin.
///
/// `admin_ids` must be distinct; each recipient is planned exactly once.
pub fn create_fanout(actor: Actor, assigned_to_id: Option<i64>, admin_ids: &[i64]) -> Vec<Emit> {
    let mut plan = Vec::new();

    match actor.role {
        UserRole::Admin => {
            for &admin_id in admin_ids {
                plan.push(Emit::ToUser {
                    user_id: admin_id,
                    event: TASK_CREATED,
                });
            }

            if let Some(assignee) = assigned_to_id {
                if assignee != actor.user_id {
                    plan.push(Emit::ToUser {
                        user_id: assignee,
                        event: TASK_ASSIGNED,
                    });
                }
            }
        }
        UserRole::User => {
            plan.push(Emit::ToUser {
                user_id: actor.user_id,
                event: TASK_CREATED,
            });

            for &admin_id in admin_ids {
                plan.push(Emit::ToUser {
                    user_id: admin_id,
                    event: TASK_CREATED,
                });
            }
        }
    }

    plan
}

/// Plans the notifications for a task update
///
/// `patched_assignee` is the assignee field of the patch: None when the
/// patch didn't touch assignment, `Some(None)` when it unassigned,
/// `Some(Some(id))` when it (re)assigned.
///
/// When the patch changes the assignee to a new non-null user, that user
/// gets `taskAssigned` exactly once. Every update ends with a single global
/// `taskUpdated` broadcast. The user who lost the assignment gets nothing.
pub fn update_fanout(
    old_assignee: Option<i64>,
    patched_assignee: Option<Option<i64>>,
) -> Vec<Emit> {
    let mut plan = Vec::new();

    if let Some(new_assignee) = patched_assignee {
        if new_assignee != old_assignee {
            if let Some(user_id) = new_assignee {
                plan.push(Emit::ToUser {
                    user_id,
                    event: TASK_ASSIGNED,
                });
            }
        }
    }

    plan.push(Emit::Global { event: TASK_UPDATED });

    plan
}

/// Plans the notifications for a task deletion: one global broadcast
pub fn delete_fanout() -> Vec<Emit> {
    vec![Emit::Global { event: TASK_DELETED }]
}
