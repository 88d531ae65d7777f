//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Registered account.
///
/// Roles are stored as a JSON list; `ROLE_USER` is implied for everyone,
/// so `roles()` always reports it even if the stored list is empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    /// Email address, also the login name (unique)
    pub email: String,
    /// Password hash (argon2 PHC string)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Roles as stored in the database
    pub roles: Vec<UserRole>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Build an unsaved user. The password must already be hashed.
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>, roles: Vec<UserRole>) -> Self {
        Self {
            id: 0,
            email: email.into(),
            password_hash: password_hash.into(),
            roles,
            created_at: Utc::now(),
        }
    }

    /// Effective roles: the stored ones plus the implicit `ROLE_USER`
    pub fn roles(&self) -> Vec<UserRole> {
        let mut roles = self.roles.clone();
        if !roles.contains(&UserRole::User) {
            roles.push(UserRole::User);
        }
        roles.sort();
        roles.dedup();
        roles
    }

    pub fn has_role(&self, role: UserRole) -> bool {
        role == UserRole::User || self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(UserRole::Admin)
    }

    /// Whether this user authored a record with the given `author_id`
    pub fn owns(&self, author_id: i64) -> bool {
        self.id == author_id
    }
}

/// Security role
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UserRole {
    #[serde(rename = "ROLE_USER")]
    User,
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
}

impl Default for UserRole {
    fn default() -> Self {
        Self::User
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::User => write!(f, "ROLE_USER"),
            UserRole::Admin => write!(f, "ROLE_ADMIN"),
        }
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ROLE_USER" => Ok(UserRole::User),
            "ROLE_ADMIN" => Ok(UserRole::Admin),
            _ => Err(anyhow::anyhow!("Invalid user role: {}", s)),
        }
    }
}

/// Encode a role list the way the `users.roles` column stores it
pub fn encode_roles(roles: &[UserRole]) -> String {
    serde_json::to_string(roles).unwrap_or_else(|_| "[]".to_string())
}

/// Decode the `users.roles` column
pub fn decode_roles(raw: &str) -> anyhow::Result<Vec<UserRole>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_always_include_user() {
        let user = User::new("a@example.com", "hash", Vec::new());
        assert_eq!(user.roles(), vec![UserRole::User]);
        assert!(user.has_role(UserRole::User));
        assert!(!user.is_admin());
    }

    #[test]
    fn test_admin_role() {
        let user = User::new("admin@example.com", "hash", vec![UserRole::Admin]);
        assert!(user.is_admin());
        assert_eq!(user.roles(), vec![UserRole::User, UserRole::Admin]);
    }

    #[test]
    fn test_owns() {
        let mut user = User::new("a@example.com", "hash", vec![UserRole::User]);
        user.id = 7;
        assert!(user.owns(7));
        assert!(!user.owns(8));
    }

    #[test]
    fn test_role_display_and_parse() {
        assert_eq!(UserRole::Admin.to_string(), "ROLE_ADMIN");
        assert_eq!("role_user".parse::<UserRole>().unwrap(), UserRole::User);
        assert!("ROLE_ROOT".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_roles_json_encoding() {
        let encoded = encode_roles(&[UserRole::User, UserRole::Admin]);
        assert_eq!(encoded, r#"["ROLE_USER","ROLE_ADMIN"]"#);
        assert_eq!(decode_roles(&encoded).unwrap(), vec![UserRole::User, UserRole::Admin]);
        assert!(decode_roles("").unwrap().is_empty());
        assert!(decode_roles("not json").is_err());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new("a@example.com", "secret-hash", vec![UserRole::User]);
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("ROLE_USER"));
    }
}
