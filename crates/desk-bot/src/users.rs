//! Chat users and their exchange credentials.

use desk_exchange::ApiCredentials;
use std::collections::HashMap;
use tracing::{info, warn};

/// Number of `BYBIT_USER_{i}_*` slots read at startup.
pub const MAX_USERS: usize = 10;

/// Maps chat user ids to exchange credentials. Read-only after startup.
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: HashMap<i64, ApiCredentials>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read slots `1..=MAX_USERS` from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(MAX_USERS, |key| std::env::var(key).ok())
    }

    /// Read slots `1..=max` through `lookup`.
    ///
    /// A slot is used only when id, key and secret are all present and the id
    /// is numeric; partial slots are skipped with a warning.
    pub fn from_lookup(max: usize, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: String| {
            lookup(&key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut directory = Self::new();
        for slot in 1..=max {
            let id = get(format!("BYBIT_USER_{slot}_ID"));
            let key = get(format!("BYBIT_USER_{slot}_KEY"));
            let secret = get(format!("BYBIT_USER_{slot}_SECRET"));

            match (id, key, secret) {
                (None, None, None) => continue,
                (Some(id), Some(key), Some(secret)) => match id.parse::<i64>() {
                    Ok(user_id) => directory.insert(user_id, ApiCredentials::new(key, secret)),
                    Err(_) => warn!(slot, id = %id, "Skipping user slot with non-numeric id"),
                },
                _ => warn!(slot, "Skipping incomplete user slot"),
            }
        }

        info!(users = ?directory.user_ids(), "Loaded user credentials");
        directory
    }

    pub fn insert(&mut self, user_id: i64, credentials: ApiCredentials) {
        self.users.insert(user_id, credentials);
    }

    pub fn credentials(&self, user_id: i64) -> Option<&ApiCredentials> {
        self.users.get(&user_id)
    }

    /// Sorted user ids.
    pub fn user_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.users.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
