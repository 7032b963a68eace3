//! Role-based authorization gate.

use std::collections::{BTreeMap, BTreeSet};

use crate::auth::Role;
use crate::job::Operation;

/// Immutable role → allowed-operations table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionMatrix {
    grants: BTreeMap<Role, BTreeSet<Operation>>,
}

impl PermissionMatrix {
    /// Matrix with no grants at all.
    pub fn empty() -> Self {
        Self {
            grants: BTreeMap::new(),
        }
    }

    /// Staff may do everything, members may only search.
    pub fn standard() -> Self {
        Self::empty()
            .with_grant(Role::Admin, Operation::ALL)
            .with_grant(Role::Librarian, Operation::ALL)
            .with_grant(Role::Member, [Operation::Search])
    }

    /// Replace the operations granted to `role`.
    pub fn with_grant(mut self, role: Role, operations: impl IntoIterator<Item = Operation>) -> Self {
        self.grants.insert(role, operations.into_iter().collect());
        self
    }

    /// Operations granted to `role`; empty for roles the matrix does not know.
    pub fn allowed(&self, role: &Role) -> impl Iterator<Item = Operation> + '_ {
        self.grants.get(role).into_iter().flatten().copied()
    }

    fn permits(&self, role: &Role, operation: Operation) -> bool {
        self.grants
            .get(role)
            .is_some_and(|operations| operations.contains(&operation))
    }
}

impl Default for PermissionMatrix {
    fn default() -> Self {
        Self::standard()
    }
}

/// Single predicate over the permission matrix. Fails closed.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationGate {
    matrix: PermissionMatrix,
}

impl AuthorizationGate {
    pub fn new(matrix: PermissionMatrix) -> Self {
        Self { matrix }
    }

    pub fn is_allowed(&self, operation: Operation, role: &Role) -> bool {
        self.matrix.permits(role, operation)
    }

    /// Operations `role` may run, in wire order.
    pub fn allowed(&self, role: &Role) -> Vec<Operation> {
        self.matrix.allowed(role).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_matrix() {
        let gate = AuthorizationGate::default();

        assert!(gate.is_allowed(Operation::Search, &Role::Member));
        assert!(!gate.is_allowed(Operation::Checkout, &Role::Member));
        assert!(!gate.is_allowed(Operation::Return, &Role::Member));

        for op in Operation::ALL {
            assert!(gate.is_allowed(op, &Role::Admin));
            assert!(gate.is_allowed(op, &Role::Librarian));
        }
    }

    #[test]
    fn test_unknown_role_denied_everything() {
        let gate = AuthorizationGate::default();
        let guest = Role::Other("guest".to_string());

        for op in Operation::ALL {
            assert!(!gate.is_allowed(op, &guest));
        }
        assert!(gate.allowed(&guest).is_empty());
    }

    #[test]
    fn test_custom_grants() {
        let matrix = PermissionMatrix::standard()
            .with_grant(Role::Librarian, [Operation::Search])
            .with_grant(Role::Other("auditor".to_string()), [Operation::Search]);
        let gate = AuthorizationGate::new(matrix);

        assert!(!gate.is_allowed(Operation::Checkout, &Role::Librarian));
        assert!(gate.is_allowed(Operation::Search, &Role::Other("auditor".to_string())));
        assert_eq!(
            gate.allowed(&Role::Admin),
            vec![Operation::Checkout, Operation::Return, Operation::Search]
        );
    }

    #[test]
    fn test_empty_matrix_denies() {
        let gate = AuthorizationGate::new(PermissionMatrix::empty());
        assert!(!gate.is_allowed(Operation::Search, &Role::Admin));
    }
}
