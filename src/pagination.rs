use std::sync::Arc;

use crate::store::UserStore;
use crate::types::{PageCursor, User, DEFAULT_PAGE_SIZE};

/// Owns the fetched user list and the cursor into the next page.
///
/// One pager instance lives for one admin session; `refresh` rebuilds the
/// list from scratch after every mutation rather than patching it in place.
pub struct UserPager<S> {
    store: Arc<S>,
    page_size: usize,
    users: Vec<User>,
    cursor: Option<PageCursor>,
    has_more: bool,
    loading: bool,
    error: Option<String>,
}

impl<S: UserStore> UserPager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_page_size(store, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(store: Arc<S>, page_size: usize) -> Self {
        Self {
            store,
            page_size,
            users: Vec::new(),
            cursor: None,
            has_more: false,
            loading: false,
            error: None,
        }
    }

    /// Fetch the first page, replacing whatever is in memory.
    pub async fn load_initial(&mut self) {
        self.load(None).await;
    }

    /// Fetch the next page and append it. No-op while loading, without a
    /// cursor, or once the store has no more records.
    pub async fn load_more(&mut self) {
        if !self.has_more || self.loading || self.cursor.is_none() {
            return;
        }
        let cursor = self.cursor.clone();
        self.load(cursor).await;
    }

    /// Drop the list and cursor, then load the first page again. Used after
    /// every mutation so the view reflects store state.
    pub async fn refresh(&mut self) {
        self.users.clear();
        self.cursor = None;
        self.has_more = false;
        self.load_initial().await;
    }

    async fn load(&mut self, cursor: Option<PageCursor>) {
        self.loading = true;
        self.error = None;

        match self.store.fetch_page(self.page_size, cursor.as_ref()).await {
            Ok(page) => {
                if cursor.is_some() {
                    self.users.extend(page.users);
                } else {
                    self.users = page.users;
                }
                self.cursor = page.next_cursor;
                self.has_more = page.has_more;
            }
            Err(err) => {
                // The list in memory stays as it was; the operator can retry.
                tracing::warn!("failed to load users: {}", err);
                self.error = Some(err.to_string());
            }
        }

        self.loading = false;
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }
}
