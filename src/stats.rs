use std::collections::HashSet;

use crate::types::{Role, User};

/// Overview numbers derived from the fetched list. Pure computation with no
/// state of its own, recomputed whenever the list changes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UserStats {
    pub total: usize,
    pub active: usize,
    pub suspended: usize,
    /// Accounts with the `admin` role specifically; `super_admin` is not
    /// included.
    pub admins: usize,
    pub total_balance: f64,
    /// Distinct non-empty countries represented.
    pub countries: usize,
}

impl UserStats {
    pub fn collect(users: &[User]) -> Self {
        let countries: HashSet<&str> = users
            .iter()
            .filter_map(|user| user.country.as_deref())
            .filter(|country| !country.is_empty())
            .collect();

        Self {
            total: users.len(),
            active: users.iter().filter(|user| user.is_active).count(),
            suspended: users.iter().filter(|user| user.is_suspended).count(),
            admins: users.iter().filter(|user| user.role == Role::Admin).count(),
            total_balance: users.iter().map(|user| user.balance).sum(),
            countries: countries.len(),
        }
    }
}
