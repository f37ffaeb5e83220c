use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AdminError, Result};
use crate::types::{Role, User, UserUpdate};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));

/// Editable field set the edit dialog binds to. Unlike [`UserUpdate`] every
/// field is concrete; converting to an update decides which optional fields
/// are written and which are explicitly cleared.
#[derive(Debug, Clone)]
pub struct UserForm {
    pub fullname: String,
    pub email: String,
    pub username: String,
    pub balance: f64,
    pub country: String,
    pub currency: String,
    pub role: Role,
    pub is_active: bool,
    pub is_suspended: bool,
}

impl UserForm {
    /// Prefill from an existing record.
    pub fn from_user(user: &User) -> Self {
        Self {
            fullname: user.fullname.clone().unwrap_or_default(),
            email: user.email.clone(),
            username: user.username.clone().unwrap_or_default(),
            balance: user.balance,
            country: user.country.clone().unwrap_or_default(),
            currency: user.currency.clone(),
            role: user.role,
            is_active: user.is_active,
            is_suspended: user.is_suspended,
        }
    }

    /// Validate and convert into a partial update. Email and full name are
    /// required; blank username/country become explicit clears.
    pub fn into_update(self) -> Result<UserUpdate> {
        let email = self.email.trim().to_string();
        let fullname = self.fullname.trim().to_string();

        if email.is_empty() {
            return Err(AdminError::validation("email", "email is required"));
        }
        if fullname.is_empty() {
            return Err(AdminError::validation("fullname", "full name is required"));
        }
        if !EMAIL_RE.is_match(&email) {
            return Err(AdminError::validation(
                "email",
                format!("{} is not a valid email address", email),
            ));
        }

        let username = self.username.trim();
        let country = self.country.trim();

        Ok(UserUpdate {
            email: Some(email),
            fullname: Some(fullname),
            username: Some(if username.is_empty() {
                None
            } else {
                Some(username.to_string())
            }),
            balance: Some(self.balance),
            country: Some(if country.is_empty() {
                None
            } else {
                Some(country.to_string())
            }),
            currency: Some(self.currency),
            role: Some(self.role),
            is_active: Some(self.is_active),
            is_suspended: Some(self.is_suspended),
            ..UserUpdate::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> UserForm {
        UserForm {
            fullname: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            username: "jdoe".to_string(),
            balance: 10.0,
            country: "Norway".to_string(),
            currency: "EUR".to_string(),
            role: Role::User,
            is_active: true,
            is_suspended: false,
        }
    }

    #[test]
    fn valid_form_converts_to_a_full_update() {
        let update = form().into_update().unwrap();
        assert_eq!(update.email.as_deref(), Some("jane@example.com"));
        assert_eq!(update.fullname.as_deref(), Some("Jane Doe"));
        assert_eq!(update.username, Some(Some("jdoe".to_string())));
        assert_eq!(update.country, Some(Some("Norway".to_string())));
        assert_eq!(update.is_active, Some(true));
        // the suspension timestamp is the store's side effect, not the form's
        assert_eq!(update.suspended_at, None);
    }

    #[test]
    fn fields_are_trimmed() {
        let mut f = form();
        f.email = "  jane@example.com  ".to_string();
        f.fullname = " Jane Doe ".to_string();
        let update = f.into_update().unwrap();
        assert_eq!(update.email.as_deref(), Some("jane@example.com"));
        assert_eq!(update.fullname.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn blank_optionals_become_explicit_clears() {
        let mut f = form();
        f.username = "   ".to_string();
        f.country = String::new();
        let update = f.into_update().unwrap();
        assert_eq!(update.username, Some(None));
        assert_eq!(update.country, Some(None));
    }

    #[test]
    fn missing_email_is_rejected() {
        let mut f = form();
        f.email = "  ".to_string();
        match f.into_update() {
            Err(AdminError::Validation { field, .. }) => assert_eq!(field, "email"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn missing_fullname_is_rejected() {
        let mut f = form();
        f.fullname = String::new();
        match f.into_update() {
            Err(AdminError::Validation { field, .. }) => assert_eq!(field, "fullname"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for bad in ["plain", "a@b", "a b@c.d", "@example.com", "a@@b.com"] {
            let mut f = form();
            f.email = bad.to_string();
            assert!(f.into_update().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn unusual_but_valid_emails_pass() {
        for good in ["a@b.co", "first.last+tag@sub.example.com"] {
            let mut f = form();
            f.email = good.to_string();
            assert!(f.into_update().is_ok(), "rejected {:?}", good);
        }
    }
}
