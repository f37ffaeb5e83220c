use async_trait::async_trait;
use chrono::Utc;

use crate::error::Result;
use crate::types::{PageCursor, UserPage, UserUpdate};

/// Boundary to the remote document store holding user accounts.
///
/// All operations are asynchronous and fail with the generic
/// [`crate::AdminError::Store`] condition; there is no batching primitive,
/// so a bulk action is N independent calls against this trait.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetch one page of users, registration-date descending. `cursor` is the
    /// token returned with the previous page; `None` starts from the newest
    /// record.
    async fn fetch_page(&self, page_size: usize, cursor: Option<&PageCursor>) -> Result<UserPage>;

    /// Partial merge into one record: unspecified fields are left untouched
    /// upstream. Implementations stamp the update time and keep the
    /// suspension timestamp in step with the flag (see
    /// [`UserUpdate::sync_suspension`]).
    async fn update_user(&self, id: &str, update: UserUpdate) -> Result<()>;

    /// Remove the record entirely.
    async fn delete_user(&self, id: &str) -> Result<()>;

    /// Suspend or unsuspend one account. The suspension timestamp is written
    /// as a side effect: set on suspend, cleared on unsuspend.
    async fn set_suspended(&self, id: &str, suspended: bool) -> Result<()> {
        let update = UserUpdate {
            is_suspended: Some(suspended),
            suspended_at: Some(if suspended { Some(Utc::now()) } else { None }),
            ..UserUpdate::default()
        };
        self.update_user(id, update).await
    }

    /// Activate or deactivate one account.
    async fn set_active(&self, id: &str, active: bool) -> Result<()> {
        let update = UserUpdate {
            is_active: Some(active),
            ..UserUpdate::default()
        };
        self.update_user(id, update).await
    }
}
