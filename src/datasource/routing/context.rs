//! 라우팅 컨텍스트
//!
//! 호출 체인마다 독립된 "현재 대상" 슬롯입니다.
//!
//! 슬롯은 두 단계로 찾습니다.
//!
//! 1. 현재 tokio 태스크가 [`RoutingContext::scope`] / [`RoutingContext::inherit`]
//!    (또는 `UsingDataSource::invoke_async`) 안에서 실행 중이면 태스크 로컬 슬롯
//! 2. 그 외에는 OS 스레드 로컬 슬롯. 런타임 태스크 안이면 태스크 ID별로 나뉩니다.
//!
//! 2번 경로 덕분에 스코프 없이 `spawn` / `spawn_local`된 태스크끼리도 값이 섞이지
//! 않습니다. 다만 한 태스크 안에서 `join!` 등으로 함께 poll되는 future들은 같은
//! 슬롯을 공유하므로, 동시에 도는 하위 future마다 다른 대상을 쓰려면
//! [`RoutingContext::scope`] 또는 `invoke_async`로 감싸야 합니다.

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::task::futures::TaskLocalFuture;
use tokio::task::Id as TaskId;

use super::target::ConnectionTarget;

// ============================================================================
// RoutingSlot - 슬롯
// ============================================================================

/// 프레임 ID 생성기 (슬롯 항목이 다시 만들어져도 겹치지 않음)
static NEXT_FRAME: AtomicU64 = AtomicU64::new(0);

/// 슬롯 내부 상태
#[derive(Debug, Default)]
struct SlotState {
    /// 현재 값 (`None` = 재정의 없음)
    current: Option<ConnectionTarget>,
    /// 활성 선택 프레임 ID (진입 순서)
    frames: Vec<u64>,
}

impl SlotState {
    const fn new(current: Option<ConnectionTarget>) -> Self {
        Self {
            current,
            frames: Vec::new(),
        }
    }

    fn is_idle(&self) -> bool {
        self.current.is_none() && self.frames.is_empty()
    }

    fn push(&mut self, target: ConnectionTarget) -> (u64, Option<ConnectionTarget>) {
        let id = NEXT_FRAME.fetch_add(1, Ordering::Relaxed);
        self.frames.push(id);
        (id, self.current.replace(target))
    }

    fn pop(&mut self, id: u64, previous: Option<ConnectionTarget>) -> Release {
        match self.frames.iter().rposition(|frame| *frame == id) {
            Some(pos) => {
                let nested = self.frames.len() - pos - 1;
                self.frames.truncate(pos);
                self.current = previous;
                if nested == 0 {
                    Release::InOrder
                } else {
                    Release::Unwound(nested)
                }
            }
            None => Release::Stale,
        }
    }
}

/// 호출 체인 하나의 라우팅 슬롯
#[derive(Debug, Default)]
pub struct RoutingSlot {
    state: RefCell<SlotState>,
}

impl RoutingSlot {
    fn new(current: Option<ConnectionTarget>) -> Self {
        Self {
            state: RefCell::new(SlotState::new(current)),
        }
    }
}

tokio::task_local! {
    static TASK_SLOT: RoutingSlot;
}

thread_local! {
    /// 스레드 슬롯 (키: 실행 중인 tokio 태스크, 런타임 밖이면 `None`)
    static THREAD_SLOTS: RefCell<HashMap<Option<TaskId>, SlotState>> = RefCell::new(HashMap::new());
}

/// 대상 재정의를 유지하는 future
pub type RoutedFuture<F> = TaskLocalFuture<RoutingSlot, F>;

/// 슬롯 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotKind {
    /// tokio 태스크 로컬
    Task,
    /// 스레드 로컬 (소유 태스크)
    Thread(Option<TaskId>),
}

fn current_kind() -> SlotKind {
    if TASK_SLOT.try_with(|_| ()).is_ok() {
        SlotKind::Task
    } else {
        SlotKind::Thread(tokio::task::try_id())
    }
}

/// 지정한 종류의 슬롯 상태 접근. 슬롯이 이미 사라졌으면 `None`
fn with_state<R>(kind: SlotKind, f: impl FnOnce(&mut SlotState) -> R) -> Option<R> {
    match kind {
        SlotKind::Task => TASK_SLOT.try_with(|slot| f(&mut slot.state.borrow_mut())).ok(),
        SlotKind::Thread(owner) => THREAD_SLOTS
            .try_with(|slots| {
                let mut slots = slots.borrow_mut();
                let state = slots.entry(owner).or_default();
                let out = f(state);
                if state.is_idle() {
                    slots.remove(&owner);
                }
                out
            })
            .ok(),
    }
}

fn read_current(kind: SlotKind) -> Option<ConnectionTarget> {
    match kind {
        SlotKind::Task => TASK_SLOT.try_with(|slot| slot.state.borrow().current).ok().flatten(),
        SlotKind::Thread(owner) => THREAD_SLOTS
            .try_with(|slots| slots.borrow().get(&owner).and_then(|state| state.current))
            .ok()
            .flatten(),
    }
}

/// 범위 선택 하나의 진입 기록
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Frame {
    kind: SlotKind,
    id: u64,
    previous: Option<ConnectionTarget>,
}

impl Frame {
    /// 진입 직전 값
    pub(crate) fn previous(&self) -> Option<ConnectionTarget> {
        self.previous
    }
}

/// 프레임 해제 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Release {
    /// 가장 안쪽 프레임 해제
    InOrder,
    /// 안쪽 프레임 n개를 함께 해제
    Unwound(usize),
    /// 바깥 프레임 해제로 이미 정리됨
    Stale,
}

// ============================================================================
// RoutingState - 상태
// ============================================================================

/// 호출 체인의 라우팅 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoutingState {
    /// 재정의 없음 (기본 대상 사용)
    #[default]
    Default,
    /// 대상 재정의됨
    Overridden(ConnectionTarget),
}

impl RoutingState {
    /// 이 상태에서 사용될 대상
    pub fn target(&self) -> ConnectionTarget {
        match self {
            Self::Default => ConnectionTarget::DEFAULT,
            Self::Overridden(target) => *target,
        }
    }

    /// 재정의 여부
    pub fn is_overridden(&self) -> bool {
        matches!(self, Self::Overridden(_))
    }

    fn from_slot(value: Option<ConnectionTarget>) -> Self {
        value.map_or(Self::Default, Self::Overridden)
    }
}

// ============================================================================
// RoutingContext - 컨텍스트
// ============================================================================

/// 호출 체인 로컬 라우팅 컨텍스트
#[derive(Debug, Clone, Copy)]
pub struct RoutingContext;

impl RoutingContext {
    /// 현재 대상 (설정되지 않았으면 기본 대상)
    pub fn get() -> ConnectionTarget {
        Self::state().target()
    }

    /// 현재 상태
    pub fn state() -> RoutingState {
        RoutingState::from_slot(Self::raw())
    }

    /// 현재 대상 재정의
    pub fn set(target: ConnectionTarget) {
        with_state(current_kind(), |state| state.current = Some(target));
    }

    /// 재정의 제거 (이후 `get()`은 기본 대상)
    pub fn clear() {
        with_state(current_kind(), |state| state.current = None);
    }

    /// 태스크 로컬 슬롯 안에서 실행 중인지 여부
    pub fn is_task_scoped() -> bool {
        current_kind() == SlotKind::Task
    }

    /// `future`를 `target`으로 미리 설정된 자체 슬롯에서 실행
    ///
    /// 슬롯은 매 poll마다 교체되므로 중첩 스코프와 취소(drop) 모두 바깥 슬롯을
    /// 건드리지 않습니다.
    pub fn scope<F: Future>(target: ConnectionTarget, future: F) -> RoutedFuture<F> {
        TASK_SLOT.scope(RoutingSlot::new(Some(target)), future)
    }

    /// 현재 값을 복사한 새 슬롯에서 `future` 실행
    ///
    /// `tokio::spawn` 전에 감싸면 부모의 대상이 자식 태스크로 전달됩니다.
    /// 자식의 변경은 부모에 보이지 않습니다.
    pub fn inherit<F: Future>(future: F) -> RoutedFuture<F> {
        TASK_SLOT.scope(RoutingSlot::new(Self::raw()), future)
    }

    /// 슬롯 원본 값
    pub(crate) fn raw() -> Option<ConnectionTarget> {
        read_current(current_kind())
    }

    /// 프레임 진입: `target`을 설정하고 복원 정보를 반환
    pub(crate) fn push(target: ConnectionTarget) -> Frame {
        let kind = current_kind();
        let (id, previous) = with_state(kind, |state| state.push(target)).unwrap_or((u64::MAX, None));
        Frame { kind, id, previous }
    }

    /// 프레임 해제
    ///
    /// 안쪽 프레임이 남아 있으면 함께 해제해 진입 직전 값으로 되돌립니다.
    /// 슬롯이 이미 사라졌으면 `None`.
    pub(crate) fn pop(frame: &Frame) -> Option<Release> {
        with_state(frame.kind, |state| state.pop(frame.id, frame.previous))
    }
}

// ============================================================================
// Tests
// ============================================================================
