//! In-memory Identity Toolkit user store, guarded the same way as
//! [`crate::store::Store`] guards documents: one lock, no persistence.

use std::collections::HashMap;

use parking_lot::RwLock;

/// A single emulated account.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub local_id: String,
    pub email: Option<String>,
    pub password: String,
    pub display_name: Option<String>,
    pub email_verified: bool,
    pub created_at_millis: i64,
}

/// Accounts keyed by `localId`, with a secondary lowercased-email index for
/// `signInWithPassword` lookups.
#[derive(Default)]
pub struct UserStore {
    by_local_id: RwLock<HashMap<String, UserRecord>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` if the email is free to register.
    pub fn find_by_email(&self, email: &str) -> Option<UserRecord> {
        let key = email.to_ascii_lowercase();
        self.by_local_id
            .read()
            .values()
            .find(|u| u.email.as_deref().map(str::to_ascii_lowercase).as_deref() == Some(&key))
            .cloned()
    }

    pub fn get(&self, local_id: &str) -> Option<UserRecord> {
        self.by_local_id.read().get(local_id).cloned()
    }

    pub fn insert(&self, user: UserRecord) {
        self.by_local_id.write().insert(user.local_id.clone(), user);
    }

    pub fn remove(&self, local_id: &str) -> bool {
        self.by_local_id.write().remove(local_id).is_some()
    }

    /// Apply the given fields to an existing user, returning the updated
    /// record, or `None` if `local_id` is unknown.
    pub fn update(
        &self,
        local_id: &str,
        email: Option<String>,
        password: Option<String>,
        display_name: Option<String>,
    ) -> Option<UserRecord> {
        let mut guard = self.by_local_id.write();
        let user = guard.get_mut(local_id)?;
        if let Some(email) = email {
            user.email = Some(email);
        }
        if let Some(password) = password {
            user.password = password;
        }
        if let Some(display_name) = display_name {
            user.display_name = Some(display_name);
        }
        Some(user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(local_id: &str, email: &str) -> UserRecord {
        UserRecord {
            local_id: local_id.to_string(),
            email: Some(email.to_string()),
            password: "secret".to_string(),
            display_name: None,
            email_verified: false,
            created_at_millis: 0,
        }
    }

    #[test]
    fn finds_by_email_case_insensitively() {
        let store = UserStore::new();
        store.insert(user("u1", "Alice@Example.com"));
        assert!(store.find_by_email("alice@example.com").is_some());
        assert!(store.find_by_email("bob@example.com").is_none());
    }

    #[test]
    fn update_only_touches_supplied_fields() {
        let store = UserStore::new();
        store.insert(user("u1", "alice@example.com"));
        let updated = store
            .update("u1", None, None, Some("Alice".to_string()))
            .unwrap();
        assert_eq!(updated.display_name.as_deref(), Some("Alice"));
        assert_eq!(updated.email.as_deref(), Some("alice@example.com"));
    }

    #[test]
    fn remove_reports_whether_a_user_existed() {
        let store = UserStore::new();
        store.insert(user("u1", "alice@example.com"));
        assert!(store.remove("u1"));
        assert!(!store.remove("u1"));
    }
}
