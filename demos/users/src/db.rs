//! In-memory user store.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::Serialize;

/// A stored user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub key: String,
    pub name: String,
}

/// Users by key.
#[derive(Debug, Default)]
pub struct Db {
    users: RwLock<HashMap<String, User>>,
}

impl Db {
    pub fn new(users: impl IntoIterator<Item = User>) -> Self {
        let users = users
            .into_iter()
            .map(|user| (user.key.clone(), user))
            .collect();
        Self {
            users: RwLock::new(users),
        }
    }

    pub fn get(&self, key: &str) -> Option<User> {
        self.users.read().get(key).cloned()
    }

    /// Sets the user's name, creating the user if needed.
    pub fn update(&self, key: &str, name: &str) -> User {
        let mut users = self.users.write();
        let user = users.entry(key.to_string()).or_insert_with(|| User {
            key: key.to_string(),
            name: String::new(),
        });
        user.name = name.to_string();
        user.clone()
    }
}
