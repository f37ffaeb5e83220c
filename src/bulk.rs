use futures::future;
use std::fmt;

use crate::error::{AdminError, Result};
use crate::store::UserStore;

/// Operator-initiated action applied to every record in a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    Suspend,
    Unsuspend,
    Activate,
    Deactivate,
    Delete,
}

impl BulkAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkAction::Suspend => "suspend",
            BulkAction::Unsuspend => "unsuspend",
            BulkAction::Activate => "activate",
            BulkAction::Deactivate => "deactivate",
            BulkAction::Delete => "delete",
        }
    }
}

impl fmt::Display for BulkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Apply `action` to every id, one store call per record, all issued
/// immediately, and wait for every call to settle.
///
/// The verdict is all-or-nothing: `Ok(n)` only if every call succeeded,
/// otherwise a single [`AdminError::Bulk`]. Per-record outcomes are not
/// retained: a batch where nine of ten calls succeed still reports plain
/// failure, with no record of which nine went through. Callers that need
/// per-item results would have to change this contract to return a result
/// vector instead.
pub async fn run_bulk<S>(store: &S, action: BulkAction, ids: &[String]) -> Result<usize>
where
    S: UserStore + ?Sized,
{
    if ids.is_empty() {
        return Ok(0);
    }

    let calls = ids.iter().map(|id| apply_action(store, action, id));
    let outcomes = future::join_all(calls).await;

    let failed = outcomes.iter().filter(|outcome| outcome.is_err()).count();
    if failed > 0 {
        tracing::warn!(
            "bulk {} failed: {} of {} calls did not complete",
            action,
            failed,
            ids.len()
        );
        return Err(AdminError::Bulk {
            action,
            total: ids.len(),
        });
    }

    tracing::info!("bulk {} applied to {} users", action, ids.len());
    Ok(ids.len())
}

async fn apply_action<S>(store: &S, action: BulkAction, id: &str) -> Result<()>
where
    S: UserStore + ?Sized,
{
    match action {
        BulkAction::Suspend => store.set_suspended(id, true).await,
        BulkAction::Unsuspend => store.set_suspended(id, false).await,
        BulkAction::Activate => store.set_active(id, true).await,
        BulkAction::Deactivate => store.set_active(id, false).await,
        BulkAction::Delete => store.delete_user(id).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_store::{sample_users, MemoryStore};

    fn ids(count: usize) -> Vec<String> {
        (0..count).map(|n| format!("user-{}", n)).collect()
    }

    #[tokio::test]
    async fn all_successes_report_one_success() {
        let store = MemoryStore::new(sample_users(5));
        let result = run_bulk(&store, BulkAction::Suspend, &ids(5)).await;
        assert!(matches!(result, Ok(5)));

        for id in ids(5) {
            let user = store.user(&id).unwrap();
            assert!(user.is_suspended);
            assert!(user.suspended_at.is_some());
        }
    }

    #[tokio::test]
    async fn one_failure_collapses_to_one_failure() {
        let store = MemoryStore::new(sample_users(5));
        store.fail_for("user-3");

        let result = run_bulk(&store, BulkAction::Suspend, &ids(5)).await;
        match result {
            Err(AdminError::Bulk { action, total }) => {
                assert_eq!(action, BulkAction::Suspend);
                assert_eq!(total, 5);
            }
            other => panic!("expected aggregate bulk failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unsuspend_clears_the_timestamp() {
        let store = MemoryStore::new(sample_users(3));
        run_bulk(&store, BulkAction::Suspend, &ids(3)).await.unwrap();
        run_bulk(&store, BulkAction::Unsuspend, &ids(3)).await.unwrap();

        for id in ids(3) {
            let user = store.user(&id).unwrap();
            assert!(!user.is_suspended);
            assert!(user.suspended_at.is_none());
        }
    }

    #[tokio::test]
    async fn deactivate_flips_the_active_flag() {
        let store = MemoryStore::new(sample_users(2));
        run_bulk(&store, BulkAction::Deactivate, &ids(2)).await.unwrap();
        assert!(!store.user("user-0").unwrap().is_active);
        assert!(!store.user("user-1").unwrap().is_active);

        run_bulk(&store, BulkAction::Activate, &ids(2)).await.unwrap();
        assert!(store.user("user-0").unwrap().is_active);
    }

    #[tokio::test]
    async fn delete_removes_every_target() {
        let store = MemoryStore::new(sample_users(4));
        let targets = ids(2);
        run_bulk(&store, BulkAction::Delete, &targets).await.unwrap();

        assert_eq!(store.len(), 2);
        assert!(store.user("user-0").is_none());
        assert!(store.user("user-2").is_some());
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let store = MemoryStore::new(sample_users(2));
        let result = run_bulk(&store, BulkAction::Delete, &[]).await;
        assert!(matches!(result, Ok(0)));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn bulk_error_message_names_action_and_batch_size() {
        let err = AdminError::Bulk {
            action: BulkAction::Delete,
            total: 10,
        };
        assert_eq!(err.to_string(), "bulk delete failed for batch of 10");
    }
}
