use crate::types::User;

/// Case-insensitive substring match over the fields an operator searches by.
/// A blank term matches everything.
pub fn matches(user: &User, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }

    let field_matches = |field: Option<&str>| {
        field
            .map(|value| value.to_lowercase().contains(&term))
            .unwrap_or(false)
    };

    user.email.to_lowercase().contains(&term)
        || field_matches(user.fullname.as_deref())
        || field_matches(user.username.as_deref())
}

pub fn filter_users<'a>(users: &'a [User], term: &str) -> Vec<&'a User> {
    users.iter().filter(|user| matches(user, term)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_store::sample_user;
    use chrono::Utc;

    #[test]
    fn blank_term_matches_everything() {
        let user = sample_user(1, Utc::now());
        assert!(matches(&user, ""));
        assert!(matches(&user, "   "));
    }

    #[test]
    fn matches_email_fullname_and_username_case_insensitively() {
        let mut user = sample_user(4, Utc::now());
        user.email = "Ada.Lovelace@Example.com".to_string();
        user.fullname = Some("Ada Lovelace".to_string());
        user.username = Some("ada42".to_string());

        assert!(matches(&user, "lovelace"));
        assert!(matches(&user, "ADA42"));
        assert!(matches(&user, "example.com"));
        assert!(!matches(&user, "babbage"));
    }

    #[test]
    fn missing_optional_fields_do_not_match() {
        let mut user = sample_user(2, Utc::now());
        user.fullname = None;
        user.username = None;
        user.email = "someone@example.com".to_string();
        assert!(!matches(&user, "user-2"));
        assert!(matches(&user, "someone"));
    }

    #[test]
    fn filter_keeps_list_order() {
        let now = Utc::now();
        let users: Vec<_> = (0..5).map(|n| sample_user(n, now)).collect();
        let hits = filter_users(&users, "user");
        assert_eq!(hits.len(), 5);
        assert_eq!(hits[0].id, users[0].id);
    }
}
