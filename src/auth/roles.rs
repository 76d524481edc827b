// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Business roles resolved from the manager directory.

/// Role of a manager within the investments business.
///
/// ## Role Hierarchy
///
/// - `Admin` - Sees every company regardless of region
/// - `User` - Sees only companies in the manager's own regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Global access
    Admin,
    /// Region-scoped access
    User,
}

impl Role {
    /// Check if this role has at least the privileges of the required role.
    pub fn has_privilege(&self, required: Role) -> bool {
        matches!(
            (self, required),
            (Role::Admin, _) | (Role::User, Role::User)
        )
    }
}
