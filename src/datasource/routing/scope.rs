//! 범위 지정 선택
//!
//! 가드가 살아 있는 동안 현재 대상을 재정의하고, 해제 시 진입 직전 값을 그대로
//! 복원합니다.

use std::marker::PhantomData;

use super::context::{Frame, Release, RoutingContext};
use super::target::ConnectionTarget;

/// 범위 지정 대상 선택 가드
///
/// 해제는 `release()` 또는 `Drop`으로 이루어지며 정상 반환, 에러 반환, 패닉
/// unwind, future drop 모든 경로에서 실행됩니다. 가드를 만든 호출 체인에서만
/// 해제할 수 있도록 `Send`가 아닙니다.
///
/// 바깥 가드가 안쪽 가드보다 먼저 해제되면 안쪽 선택까지 함께 해제되고, 나중에
/// 해제되는 안쪽 가드는 아무것도 바꾸지 않습니다. 따라서 모든 가드가 사라지면
/// 항상 첫 진입 전 상태로 돌아갑니다.
///
/// 비동기 코드에서 가드를 `.await` 너머로 유지할 때는 같은 태스크에서 함께
/// poll되는 다른 future가 값을 보게 됩니다. 동시에 도는 future마다 대상을
/// 나누려면 [`RoutingContext::scope`] 또는 `UsingDataSource::invoke_async`를
/// 사용하세요.
///
/// ```rust
/// use multi_datasource::{ConnectionTarget, RoutingContext, ScopedSelection};
///
/// let outer = ScopedSelection::enter(ConnectionTarget::Replica1);
/// {
///     let _inner = ScopedSelection::enter(ConnectionTarget::Replica2);
///     assert_eq!(RoutingContext::get(), ConnectionTarget::Replica2);
/// }
/// assert_eq!(RoutingContext::get(), ConnectionTarget::Replica1);
/// outer.release();
/// assert_eq!(RoutingContext::get(), ConnectionTarget::Primary);
/// ```
#[must_use = "the selection is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ScopedSelection {
    /// 선택한 대상
    target: ConnectionTarget,
    /// 진입 기록
    frame: Frame,
    _not_send: PhantomData<*const ()>,
}

impl ScopedSelection {
    /// 대상 선택 시작
    pub fn enter(target: ConnectionTarget) -> Self {
        let frame = RoutingContext::push(target);
        tracing::trace!(
            datasource = %target,
            previous = ?frame.previous(),
            "enter datasource selection"
        );
        Self {
            target,
            frame,
            _not_send: PhantomData,
        }
    }

    /// 선택한 대상
    pub fn target(&self) -> ConnectionTarget {
        self.target
    }

    /// 해제 시 복원될 대상
    pub fn previous(&self) -> ConnectionTarget {
        self.frame.previous().unwrap_or(ConnectionTarget::DEFAULT)
    }

    /// 명시적 해제
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for ScopedSelection {
    fn drop(&mut self) {
        match RoutingContext::pop(&self.frame) {
            Some(Release::InOrder) => {}
            Some(Release::Unwound(nested)) => {
                tracing::warn!(
                    datasource = %self.target,
                    nested,
                    "datasource selection released out of order, nested selections unwound"
                );
            }
            Some(Release::Stale) => {
                tracing::warn!(
                    datasource = %self.target,
                    "datasource selection already unwound by an enclosing release"
                );
            }
            None => {
                tracing::warn!(
                    datasource = %self.target,
                    "datasource selection released after its call chain ended"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::routing::RoutingState;
    use futures::FutureExt;

    #[test]
    fn test_enter_and_release() {
        let selection = ScopedSelection::enter(ConnectionTarget::Replica1);
        assert_eq!(selection.target(), ConnectionTarget::Replica1);
        assert_eq!(selection.previous(), ConnectionTarget::Primary);
        assert_eq!(RoutingContext::get(), ConnectionTarget::Replica1);

        selection.release();
        assert_eq!(RoutingContext::state(), RoutingState::Default);
    }

    #[test]
    fn test_nested_restores_enclosing_target() {
        let a = ScopedSelection::enter(ConnectionTarget::Replica1);
        let b = ScopedSelection::enter(ConnectionTarget::Replica2);
        assert_eq!(b.previous(), ConnectionTarget::Replica1);
        assert_eq!(RoutingContext::get(), ConnectionTarget::Replica2);

        b.release();
        assert_eq!(RoutingContext::get(), ConnectionTarget::Replica1);

        a.release();
        assert_eq!(RoutingContext::state(), RoutingState::Default);
    }

    #[test]
    fn test_restores_explicit_previous_value() {
        RoutingContext::set(ConnectionTarget::Replica2);
        {
            let _selection = ScopedSelection::enter(ConnectionTarget::Replica1);
            assert_eq!(RoutingContext::get(), ConnectionTarget::Replica1);
        }
        // 기본값이 아니라 진입 직전 값으로 복원
        assert_eq!(
            RoutingContext::state(),
            RoutingState::Overridden(ConnectionTarget::Replica2)
        );
        RoutingContext::clear();
    }

    #[test]
    fn test_same_target_nesting() {
        let outer = ScopedSelection::enter(ConnectionTarget::Replica1);
        let inner = ScopedSelection::enter(ConnectionTarget::Replica1);
        inner.release();
        assert_eq!(RoutingContext::get(), ConnectionTarget::Replica1);
        outer.release();
        assert_eq!(RoutingContext::state(), RoutingState::Default);
    }

    #[test]
    fn test_released_on_panic() {
        let result = std::panic::catch_unwind(|| {
            let _selection = ScopedSelection::enter(ConnectionTarget::Replica2);
            panic!("query failed");
        });

        assert!(result.is_err());
        assert_eq!(RoutingContext::state(), RoutingState::Default);
    }

    #[test]
    fn test_released_on_error_return() {
        fn execute() -> Result<u32, String> {
            Err("timeout".to_string())
        }

        fn query() -> Result<u32, String> {
            let _selection = ScopedSelection::enter(ConnectionTarget::Replica1);
            let rows = execute()?;
            Ok(rows)
        }

        assert!(query().is_err());
        assert_eq!(RoutingContext::state(), RoutingState::Default);
    }

    #[tokio::test]
    async fn test_guard_inside_task_scope() {
        RoutingContext::scope(ConnectionTarget::Replica1, async {
            {
                let _selection = ScopedSelection::enter(ConnectionTarget::Replica2);
                tokio::task::yield_now().await;
                assert_eq!(RoutingContext::get(), ConnectionTarget::Replica2);
            }
            assert_eq!(RoutingContext::get(), ConnectionTarget::Replica1);
        })
        .await;

        assert_eq!(RoutingContext::state(), RoutingState::Default);
    }

    #[tokio::test]
    async fn test_guard_released_when_future_cancelled() {
        let (_tx, rx) = tokio::sync::oneshot::channel::<()>();

        let work = RoutingContext::scope(ConnectionTarget::Replica1, async move {
            let _selection = ScopedSelection::enter(ConnectionTarget::Replica2);
            let _ = rx.await;
        });

        // 한 번 poll 한 뒤 drop (취소)
        assert!(work.now_or_never().is_none());
        assert_eq!(RoutingContext::state(), RoutingState::Default);
    }

    #[test]
    fn test_out_of_order_release_returns_to_default() {
        let a = ScopedSelection::enter(ConnectionTarget::Replica1);
        let b = ScopedSelection::enter(ConnectionTarget::Replica2);

        a.release();
        assert_eq!(RoutingContext::state(), RoutingState::Default);

        b.release();
        assert_eq!(RoutingContext::state(), RoutingState::Default);
    }

    #[test]
    fn test_out_of_order_release_keeps_enclosing() {
        let outer = ScopedSelection::enter(ConnectionTarget::Replica2);
        let a = ScopedSelection::enter(ConnectionTarget::Replica1);
        let b = ScopedSelection::enter(ConnectionTarget::Primary);

        a.release();
        assert_eq!(RoutingContext::get(), ConnectionTarget::Replica2);

        // 이미 정리된 가드는 이후 선택을 건드리지 않음
        let c = ScopedSelection::enter(ConnectionTarget::Replica1);
        b.release();
        assert_eq!(RoutingContext::get(), ConnectionTarget::Replica1);

        c.release();
        assert_eq!(RoutingContext::get(), ConnectionTarget::Replica2);
        outer.release();
        assert_eq!(RoutingContext::state(), RoutingState::Default);
    }

    #[test]
    fn test_unwound_guard_ignores_later_selections() {
        let a = ScopedSelection::enter(ConnectionTarget::Replica1);
        let b = ScopedSelection::enter(ConnectionTarget::Replica2);
        a.release();

        // 슬롯이 비워진 뒤 새로 시작한 선택들
        let c = ScopedSelection::enter(ConnectionTarget::Replica1);
        let d = ScopedSelection::enter(ConnectionTarget::Replica2);
        b.release();
        assert_eq!(RoutingContext::get(), ConnectionTarget::Replica2);

        d.release();
        assert_eq!(RoutingContext::get(), ConnectionTarget::Replica1);
        c.release();
        assert_eq!(RoutingContext::state(), RoutingState::Default);
    }

    #[test]
    fn test_release_restores_over_inner_set() {
        let selection = ScopedSelection::enter(ConnectionTarget::Replica1);
        RoutingContext::set(ConnectionTarget::Replica2);
        selection.release();
        assert_eq!(RoutingContext::state(), RoutingState::Default);
    }

    #[tokio::test]
    async fn test_guard_isolated_between_local_tasks() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let (entered_tx, entered_rx) = tokio::sync::oneshot::channel::<()>();
                let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();

                let holder = tokio::task::spawn_local(async move {
                    let _selection = ScopedSelection::enter(ConnectionTarget::Replica1);
                    entered_tx.send(()).unwrap();
                    tokio::task::yield_now().await;
                    done_rx.await.unwrap();
                    RoutingContext::get()
                });
                let observer = tokio::task::spawn_local(async move {
                    entered_rx.await.unwrap();
                    let seen = RoutingContext::get();
                    done_tx.send(()).unwrap();
                    seen
                });

                assert_eq!(observer.await.unwrap(), ConnectionTarget::Primary);
                assert_eq!(holder.await.unwrap(), ConnectionTarget::Replica1);
            })
            .await;

        assert_eq!(RoutingContext::state(), RoutingState::Default);
    }

    #[tokio::test]
    async fn test_local_task_guard_cancelled() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let (_tx, rx) = tokio::sync::oneshot::channel::<()>();
                let (entered_tx, entered_rx) = tokio::sync::oneshot::channel::<()>();

                let holder = tokio::task::spawn_local(async move {
                    let _selection = ScopedSelection::enter(ConnectionTarget::Replica2);
                    entered_tx.send(()).unwrap();
                    let _ = rx.await;
                });
                entered_rx.await.unwrap();
                holder.abort();
                assert!(holder.await.unwrap_err().is_cancelled());

                assert_eq!(RoutingContext::state(), RoutingState::Default);
            })
            .await;
    }
}
