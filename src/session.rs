use std::sync::Arc;

use crate::bulk::{self, BulkAction};
use crate::edit::UserForm;
use crate::error::Result;
use crate::pagination::UserPager;
use crate::search;
use crate::selection::{SelectAllState, SelectionTracker};
use crate::stats::UserStats;
use crate::store::UserStore;
use crate::types::User;

/// One admin session: the user list, the current selection, and the
/// mutations an operator can run against them. Owns its state for the
/// lifetime of the surface it backs and is rebuilt on navigation.
pub struct AdminSession<S> {
    store: Arc<S>,
    pager: UserPager<S>,
    selection: SelectionTracker,
    sticky_selection: bool,
    bulk_running: bool,
}

impl<S: UserStore> AdminSession<S> {
    pub fn new(store: S) -> Self {
        let store = Arc::new(store);
        Self {
            pager: UserPager::new(Arc::clone(&store)),
            store,
            selection: SelectionTracker::new(),
            sticky_selection: false,
            bulk_running: false,
        }
    }

    /// Keep the selection across refreshes instead of clearing it. Off by
    /// default; either way the selection always clears after a batch.
    pub fn with_sticky_selection(mut self, sticky: bool) -> Self {
        self.sticky_selection = sticky;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.pager = UserPager::with_page_size(Arc::clone(&self.store), page_size);
        self
    }

    /// Initial load for a freshly opened session.
    pub async fn start(&mut self) {
        self.pager.load_initial().await;
    }

    pub async fn load_more(&mut self) {
        self.pager.load_more().await;
    }

    /// Re-fetch the first page. Clears the selection unless sticky.
    pub async fn refresh(&mut self) {
        self.pager.refresh().await;
        if !self.sticky_selection {
            self.selection.clear();
        }
    }

    pub fn users(&self) -> &[User] {
        self.pager.users()
    }

    pub fn loading(&self) -> bool {
        self.pager.loading()
    }

    pub fn error(&self) -> Option<&str> {
        self.pager.error()
    }

    pub fn has_more(&self) -> bool {
        self.pager.has_more()
    }

    /// True while a batch is in flight, so the surface can disable the
    /// controls that would start another.
    pub fn bulk_running(&self) -> bool {
        self.bulk_running
    }

    pub fn selection(&self) -> &SelectionTracker {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionTracker {
        &mut self.selection
    }

    pub fn select_all_state(&self) -> SelectAllState {
        SelectAllState::derive(self.selection.len(), self.pager.users().len())
    }

    /// Header-checkbox behavior: deselect everything when everything visible
    /// is selected, otherwise select the whole visible list.
    pub fn toggle_select_all(&mut self) {
        if self.select_all_state() == SelectAllState::Checked {
            self.selection.clear();
        } else {
            let ids: Vec<String> = self.pager.users().iter().map(|u| u.id.clone()).collect();
            self.selection.select_all(ids);
        }
    }

    /// Aggregates over the fetched list.
    pub fn stats(&self) -> UserStats {
        UserStats::collect(self.pager.users())
    }

    /// Case-insensitive filter over the fetched list.
    pub fn search(&self, term: &str) -> Vec<&User> {
        search::filter_users(self.pager.users(), term)
    }

    /// Run one bulk action over the selection, restricted to currently
    /// visible records. On completion the list refreshes and the selection
    /// clears regardless of verdict, since the batch may have partially
    /// applied.
    pub async fn run_bulk(&mut self, action: BulkAction) -> Result<usize> {
        let ids: Vec<String> = self
            .pager
            .users()
            .iter()
            .filter(|user| self.selection.is_selected(&user.id))
            .map(|user| user.id.clone())
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }

        self.bulk_running = true;
        let outcome = bulk::run_bulk(self.store.as_ref(), action, &ids).await;
        self.bulk_running = false;

        self.pager.refresh().await;
        self.selection.clear();
        outcome
    }

    /// Flip one account's suspension state and re-fetch.
    pub async fn toggle_suspension(&mut self, id: &str) -> Result<()> {
        let currently = self
            .pager
            .users()
            .iter()
            .find(|user| user.id == id)
            .map(|user| user.is_suspended)
            .unwrap_or(false);
        self.store.set_suspended(id, !currently).await?;
        self.refresh().await;
        Ok(())
    }

    /// Validate and persist an edit, then re-fetch.
    pub async fn save_edit(&mut self, id: &str, form: UserForm) -> Result<()> {
        let update = form.into_update()?;
        self.store.update_user(id, update).await?;
        self.refresh().await;
        Ok(())
    }

    /// Delete one account, then re-fetch.
    pub async fn delete_user(&mut self, id: &str) -> Result<()> {
        self.store.delete_user(id).await?;
        self.refresh().await;
        Ok(())
    }
}
