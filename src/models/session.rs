//! Login session model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Server-side session; `id` is the token carried by the `session` cookie
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Start a fresh session with a random UUID v4 token
    pub fn start(user_id: i64, lifetime_days: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + Duration::days(lifetime_days),
            created_at: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }

    /// Seconds until expiry, floored at zero. Used as the cookie `Max-Age`.
    pub fn max_age_secs(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds().max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_session() {
        let session = Session::start(3, 7);
        assert_eq!(session.user_id, 3);
        assert!(!session.is_expired());
        assert!(Uuid::parse_str(&session.id).is_ok());

        let max_age = session.max_age_secs();
        assert!(max_age > 6 * 24 * 3600 && max_age <= 7 * 24 * 3600);
    }

    #[test]
    fn test_expired_session() {
        let mut session = Session::start(1, 1);
        session.expires_at = Utc::now() - Duration::seconds(5);
        assert!(session.is_expired());
        assert_eq!(session.max_age_secs(), 0);
    }
}
