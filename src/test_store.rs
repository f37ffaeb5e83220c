//! In-memory [`UserStore`] used by the controller and orchestrator tests:
//! a sorted record set with per-id and whole-fetch failure injection.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Map;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::{AdminError, Result};
use crate::store::UserStore;
use crate::types::{PageCursor, Role, User, UserPage, UserUpdate};

pub(crate) struct MemoryStore {
    users: Mutex<Vec<User>>,
    fail_fetch: AtomicBool,
    fail_ids: Mutex<HashSet<String>>,
    fetch_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new(mut users: Vec<User>) -> Self {
        // Newest first, the order the live index serves.
        users.sort_by(|a, b| {
            b.registration_date
                .cmp(&a.registration_date)
                .then_with(|| b.id.cmp(&a.id))
        });
        Self {
            users: Mutex::new(users),
            fail_fetch: AtomicBool::new(false),
            fail_ids: Mutex::new(HashSet::new()),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    /// Make every fetch fail until turned off again.
    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    /// Make mutations against `id` fail.
    pub fn fail_for(&self, id: &str) {
        self.fail_ids.lock().unwrap().insert(id.to_string());
    }

    pub fn user(&self, id: &str) -> Option<User> {
        self.users.lock().unwrap().iter().find(|u| u.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    fn check_mutable(&self, id: &str) -> Result<()> {
        if self.fail_ids.lock().unwrap().contains(id) {
            return Err(AdminError::Store(format!("write rejected for {}", id)));
        }
        Ok(())
    }
}

fn sort_key(user: &User) -> String {
    user.registration_date.to_rfc3339()
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn fetch_page(&self, page_size: usize, cursor: Option<&PageCursor>) -> Result<UserPage> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(AdminError::Store("store offline".to_string()));
        }

        let users = self.users.lock().unwrap();
        let start = match cursor {
            Some(cursor) => match users.iter().position(|u| u.id == cursor.id()) {
                Some(idx) => idx + 1,
                // Cursor record is gone; resume at the first strictly older one.
                None => users
                    .iter()
                    .position(|u| sort_key(u).as_str() < cursor.sort_key())
                    .unwrap_or(users.len()),
            },
            None => 0,
        };

        let page: Vec<User> = users.iter().skip(start).take(page_size).cloned().collect();
        let has_more = page.len() == page_size;
        let next_cursor = page.last().map(|u| PageCursor::new(sort_key(u), u.id.clone()));

        Ok(UserPage {
            users: page,
            next_cursor,
            has_more,
        })
    }

    async fn update_user(&self, id: &str, update: UserUpdate) -> Result<()> {
        self.check_mutable(id)?;
        let now = Utc::now();
        let update = update.sync_suspension(now);

        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AdminError::Store(format!("user {} not found", id)))?;

        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(fullname) = update.fullname {
            user.fullname = Some(fullname);
        }
        if let Some(username) = update.username {
            user.username = username;
        }
        if let Some(balance) = update.balance {
            user.balance = balance;
        }
        if let Some(country) = update.country {
            user.country = country;
        }
        if let Some(currency) = update.currency {
            user.currency = currency;
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        if let Some(active) = update.is_active {
            user.is_active = active;
        }
        if let Some(suspended) = update.is_suspended {
            user.is_suspended = suspended;
        }
        if let Some(suspended_at) = update.suspended_at {
            user.suspended_at = suspended_at;
        }
        for (name, value) in update.extra {
            user.extra.insert(name, value);
        }
        user.updated_at = Some(now);
        Ok(())
    }

    async fn delete_user(&self, id: &str) -> Result<()> {
        self.check_mutable(id)?;
        self.users.lock().unwrap().retain(|u| u.id != id);
        Ok(())
    }
}

/// Deterministic record: `user-<n>`, registered `n` minutes before `base`.
pub(crate) fn sample_user(n: usize, base: DateTime<Utc>) -> User {
    User {
        id: format!("user-{}", n),
        email: format!("user{}@example.com", n),
        fullname: Some(format!("User {}", n)),
        username: Some(format!("user{}", n)),
        balance: n as f64 * 10.0,
        country: None,
        currency: "USD".to_string(),
        role: Role::User,
        is_active: true,
        is_suspended: false,
        registration_date: base - Duration::minutes(n as i64),
        suspended_at: None,
        updated_at: None,
        extra: Map::new(),
    }
}

/// `count` records, newest (`user-0`) first.
pub(crate) fn sample_users(count: usize) -> Vec<User> {
    let base = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    (0..count).map(|n| sample_user(n, base)).collect()
}
