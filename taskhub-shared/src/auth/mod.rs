/// Authentication primitives
///
/// - `jwt`: access-token creation and validation (HS256)
/// - `password`: Argon2id hashing, verification, and strength checks
///
/// This module also defines [`Actor`], the authenticated identity attached
/// to every request after token validation. The actor carries only what the
/// task pipeline needs to make decisions: a user id and a role.

pub mod jwt;
pub mod password;

use crate::models::user::UserRole;
use serde::{Deserialize, Serialize};

/// The authenticated identity performing an operation
///
/// Inserted into request extensions by the API's auth middleware and
/// consumed by route handlers and the task mutation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Authenticated user id
    pub user_id: i64,

    /// Role, as a closed enum so policy branching is exhaustive
    pub role: UserRole,
}

impl Actor {
    /// Creates an actor from validated JWT claims
    pub fn new(user_id: i64, role: UserRole) -> Self {
        Self { user_id, role }
    }

    /// Whether this actor holds the admin role
    pub fn is_admin(&self) -> bool {
        matches!(self.role, UserRole::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_admin() {
        assert!(Actor::new(1, UserRole::Admin).is_admin());
        assert!(!Actor::new(1, UserRole::User).is_admin());
    }
}
