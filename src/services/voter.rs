//! Authorization decisions
//!
//! Two rules cover the whole application:
//! - posts and notes may be changed by their author or by an admin;
//! - categories and todo items belong to their author alone.
//!
//! `vote` answers user-on-user questions (may this actor view, edit or
//! delete that account).

use crate::models::{Entry, User};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Permission {
    View,
    Edit,
    Delete,
}

impl Permission {
    pub const ALL: [Permission; 3] = [Permission::View, Permission::Edit, Permission::Delete];
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::View => write!(f, "VIEW"),
            Permission::Edit => write!(f, "EDIT"),
            Permission::Delete => write!(f, "DELETE"),
        }
    }
}

/// Account-level rule: grant when the actor is an admin or is the subject
/// account itself. Anonymous actors are always denied.
///
/// No page edits or deletes accounts, so handlers call `can_manage_entry`
/// and `can_access_owned` instead. An account settings page must go
/// through this check.
pub fn vote(actor: Option<&User>, permission: Permission, subject: &User) -> bool {
    let Some(actor) = actor else {
        return false;
    };

    let granted = actor.is_admin() || actor.email == subject.email;
    if !granted {
        tracing::debug!(
            actor_id = actor.id,
            subject_id = subject.id,
            %permission,
            "vote denied"
        );
    }
    granted
}

/// Edit/delete rule for posts and notes: owner or admin
pub fn can_manage_entry(actor: Option<&User>, entry: &Entry) -> bool {
    actor.is_some_and(|user| user.is_admin() || user.owns(entry.author_id))
}

/// Access rule for categories and todo items: owner only, no admin bypass
pub fn can_access_owned(actor: Option<&User>, author_id: i64) -> bool {
    actor.is_some_and(|user| user.owns(author_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, EntryKind, UserRole};
    use chrono::Utc;

    fn user(id: i64, email: &str, roles: Vec<UserRole>) -> User {
        let mut user = User::new(email, "hash", roles);
        user.id = id;
        user
    }

    fn entry_by(author_id: i64) -> Entry {
        Entry {
            id: 1,
            kind: EntryKind::Post,
            title: "Title".to_string(),
            content: None,
            category: Category {
                id: 1,
                author_id,
                title: "General".to_string(),
            },
            author_id,
            author_email: "author@example.com".to_string(),
            tags: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_vote_matrix() {
        let admin = user(1, "admin@example.com", vec![UserRole::User, UserRole::Admin]);
        let alice = user(2, "alice@example.com", vec![UserRole::User]);
        let bob = user(3, "bob@example.com", vec![UserRole::User]);

        for permission in Permission::ALL {
            assert!(vote(Some(&admin), permission, &alice));
            assert!(vote(Some(&alice), permission, &alice));
            assert!(!vote(Some(&bob), permission, &alice));
            assert!(!vote(None, permission, &alice));
        }
    }

    #[test]
    fn test_vote_compares_email_not_id() {
        let stored = user(2, "alice@example.com", vec![UserRole::User]);
        let same_account = user(0, "alice@example.com", vec![]);
        assert!(vote(Some(&same_account), Permission::Edit, &stored));
    }

    #[test]
    fn test_can_manage_entry() {
        let admin = user(1, "admin@example.com", vec![UserRole::Admin]);
        let owner = user(2, "owner@example.com", vec![UserRole::User]);
        let other = user(3, "other@example.com", vec![UserRole::User]);
        let entry = entry_by(2);

        assert!(can_manage_entry(Some(&owner), &entry));
        assert!(can_manage_entry(Some(&admin), &entry));
        assert!(!can_manage_entry(Some(&other), &entry));
        assert!(!can_manage_entry(None, &entry));
    }

    #[test]
    fn test_can_access_owned_excludes_admin() {
        let admin = user(1, "admin@example.com", vec![UserRole::Admin]);
        let owner = user(2, "owner@example.com", vec![UserRole::User]);

        assert!(can_access_owned(Some(&owner), 2));
        assert!(!can_access_owned(Some(&admin), 2));
        assert!(!can_access_owned(None, 2));
    }

    #[test]
    fn test_permission_display() {
        assert_eq!(Permission::Edit.to_string(), "EDIT");
        assert_eq!(Permission::View.to_string(), "VIEW");
    }
}
