//! Per-request tenant storage.
//!
//! Inside [`RequestTenantScope::run`] the slot belongs to the async task
//! driving the request, so concurrent requests never observe each other's
//! binding even when they share worker threads. Plain threads outside any
//! runtime get a per-thread slot. Unscoped code running on a tokio runtime has
//! no slot at all: worker threads are shared by many tasks, so writes there are
//! dropped and reads see nothing.
//!
//! ```rust,ignore
//! RequestTenantScope::run(async {
//!     RequestTenantScope::set(context);
//!     let tenant_id = RequestTenantScope::require_tenant_id()?;
//!     // ...
//! })
//! .await;
//! ```

use std::cell::RefCell;
use std::future::Future;

use tokio::task::JoinHandle;
use uuid::Uuid;

use super::{TenantContext, TenantError};

tokio::task_local! {
    static TASK_SLOT: RefCell<Option<TenantContext>>;
}

thread_local! {
    static THREAD_SLOT: RefCell<Option<TenantContext>> = const { RefCell::new(None) };
}

/// Runs `f` against the slot owned by the current execution unit, or returns
/// `None` when the caller is an unscoped task on a tokio runtime.
fn with_slot<R>(f: impl FnOnce(&mut Option<TenantContext>) -> R) -> Option<R> {
    if RequestTenantScope::is_scoped() {
        Some(TASK_SLOT.with(|slot| f(&mut slot.borrow_mut())))
    } else if tokio::runtime::Handle::try_current().is_ok() {
        None
    } else {
        Some(THREAD_SLOT.with(|slot| f(&mut slot.borrow_mut())))
    }
}

/// Accessors for the tenant bound to the current execution unit.
pub struct RequestTenantScope;

impl RequestTenantScope {
    /// Drive `future` with a fresh, empty slot. The slot is released when the
    /// future completes or is dropped.
    pub async fn run<F: Future>(future: F) -> F::Output {
        TASK_SLOT.scope(RefCell::new(None), future).await
    }

    /// Like [`run`](Self::run) with `context` already bound.
    pub async fn run_with<F: Future>(context: TenantContext, future: F) -> F::Output {
        TASK_SLOT.scope(RefCell::new(Some(context)), future).await
    }

    /// Spawn a task that starts with a snapshot of the current binding.
    /// Changes made by the child stay in the child.
    pub fn spawn_inheriting<F>(future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let snapshot = Self::get();
        tokio::spawn(TASK_SLOT.scope(RefCell::new(snapshot), future))
    }

    /// True when called from inside [`run`](Self::run) or a task spawned by
    /// [`spawn_inheriting`](Self::spawn_inheriting).
    pub fn is_scoped() -> bool {
        TASK_SLOT.try_with(|_| ()).is_ok()
    }

    /// Bind `context`, replacing any previous binding.
    ///
    /// Ignored, with an error log, when called from a runtime task that is not
    /// inside [`run`](Self::run).
    pub fn set(context: TenantContext) {
        let tenant_id = context.tenant_id();
        if with_slot(|slot| *slot = Some(context)).is_none() {
            tracing::error!(
                %tenant_id,
                "Tenant binding ignored: task is not running inside a request scope"
            );
        }
    }

    pub fn get() -> Option<TenantContext> {
        with_slot(|slot| slot.clone()).flatten()
    }

    pub fn require() -> Result<TenantContext, TenantError> {
        Self::get().ok_or(TenantError::ContextMissing)
    }

    pub fn require_tenant_id() -> Result<Uuid, TenantError> {
        Self::require().map(|context| context.tenant_id())
    }

    /// Remove any binding. A no-op when nothing is bound.
    pub fn clear() {
        with_slot(|slot| *slot = None);
    }

    /// Bind `context` until the returned guard is dropped.
    pub fn enter(context: TenantContext) -> TenantScopeGuard {
        Self::set(context);
        TenantScopeGuard { _private: () }
    }

    /// A guard that clears the slot when dropped, without binding anything.
    pub fn guard() -> TenantScopeGuard {
        TenantScopeGuard { _private: () }
    }
}

/// Clears the current slot on drop, including during unwinding.
#[must_use = "the binding is cleared as soon as the guard is dropped"]
#[derive(Debug)]
pub struct TenantScopeGuard {
    _private: (),
}

impl Drop for TenantScopeGuard {
    fn drop(&mut self) {
        RequestTenantScope::clear();
        tracing::trace!("Tenant scope cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::time::Duration;

    fn tenant(slug: &str) -> TenantContext {
        TenantContext::new(Uuid::new_v4(), slug, true)
    }

    #[tokio::test]
    async fn stores_and_retrieves_context() {
        RequestTenantScope::run(async {
            let ctx = tenant("tenant-a");
            RequestTenantScope::set(ctx.clone());

            assert_eq!(RequestTenantScope::get(), Some(ctx.clone()));
            assert_eq!(RequestTenantScope::require().unwrap(), ctx);
            assert_eq!(
                RequestTenantScope::require_tenant_id().unwrap(),
                ctx.tenant_id()
            );
        })
        .await;
    }

    #[tokio::test]
    async fn clear_removes_binding_and_is_idempotent() {
        RequestTenantScope::run(async {
            RequestTenantScope::set(tenant("tenant-a"));
            RequestTenantScope::clear();
            assert!(RequestTenantScope::get().is_none());

            RequestTenantScope::clear();
            assert!(RequestTenantScope::get().is_none());
            assert_eq!(
                RequestTenantScope::require_tenant_id(),
                Err(TenantError::ContextMissing)
            );
        })
        .await;
    }

    #[tokio::test]
    async fn last_set_wins() {
        RequestTenantScope::run(async {
            RequestTenantScope::set(tenant("first"));
            RequestTenantScope::set(tenant("second"));
            assert_eq!(RequestTenantScope::require().unwrap().slug(), "second");
        })
        .await;
    }

    #[tokio::test]
    async fn slot_does_not_outlive_run() {
        let ctx = tenant("tenant-a");
        let inside = RequestTenantScope::run_with(ctx.clone(), async {
            RequestTenantScope::get()
        })
        .await;
        assert_eq!(inside, Some(ctx));
        assert!(!RequestTenantScope::is_scoped());
        assert!(RequestTenantScope::get().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_requests_are_isolated() {
        let handles: Vec<_> = (0..16)
            .map(|i| {
                tokio::spawn(RequestTenantScope::run(async move {
                    let ctx = tenant(&format!("tenant-{i}"));
                    RequestTenantScope::set(ctx.clone());
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    tokio::task::yield_now().await;
                    RequestTenantScope::get() == Some(ctx)
                }))
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap());
        }
    }

    #[tokio::test]
    async fn child_task_inherits_snapshot_without_propagating_back() {
        RequestTenantScope::run(async {
            let parent = tenant("parent");
            RequestTenantScope::set(parent.clone());

            let child = RequestTenantScope::spawn_inheriting(async {
                let seen = RequestTenantScope::get();
                RequestTenantScope::set(tenant("child"));
                RequestTenantScope::clear();
                seen
            });

            assert_eq!(child.await.unwrap(), Some(parent.clone()));
            assert_eq!(RequestTenantScope::get(), Some(parent));
        })
        .await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn unscoped_tasks_do_not_share_a_binding() {
        tokio::spawn(async {
            RequestTenantScope::set(tenant("task-a"));
            assert!(RequestTenantScope::get().is_none());
        })
        .await
        .unwrap();

        // same single worker thread, different task
        let observed = tokio::spawn(async { RequestTenantScope::get() })
            .await
            .unwrap();
        assert!(observed.is_none());
    }

    #[tokio::test]
    async fn guard_held_across_await_outside_a_scope_leaves_nothing_behind() {
        {
            let _guard = RequestTenantScope::enter(tenant("unscoped"));
            tokio::task::yield_now().await;
            assert!(RequestTenantScope::get().is_none());
        }
        assert!(THREAD_SLOT.with(|slot| slot.borrow().is_none()));
    }

    #[test]
    fn threads_outside_a_scope_get_their_own_slot() {
        let ctx = tenant("main-thread");
        let _guard = RequestTenantScope::enter(ctx.clone());

        let seen_elsewhere = std::thread::spawn(RequestTenantScope::get).join().unwrap();
        assert!(seen_elsewhere.is_none());
        assert_eq!(RequestTenantScope::get(), Some(ctx));
    }

    #[test]
    fn guard_clears_on_drop_and_on_panic() {
        {
            let _guard = RequestTenantScope::enter(tenant("scoped"));
            assert!(RequestTenantScope::get().is_some());
        }
        assert!(RequestTenantScope::get().is_none());

        let result = catch_unwind(AssertUnwindSafe(|| {
            let _guard = RequestTenantScope::enter(tenant("panicking"));
            panic!("handler failed");
        }));
        assert!(result.is_err());
        assert!(RequestTenantScope::get().is_none());
    }
}
