//! 호출 인터셉터
//!
//! 연산에 정적으로 선언된 대상을 적용합니다.
//!
//! # 예시
//!
//! ```rust
//! use multi_datasource::{ConnectionTarget, RoutingContext, UsingDataSource};
//!
//! const FROM_SLAVE: UsingDataSource = UsingDataSource::new(ConnectionTarget::Replica1);
//!
//! let seen = FROM_SLAVE.invoke(RoutingContext::get);
//! assert_eq!(seen, ConnectionTarget::Replica1);
//! assert_eq!(RoutingContext::get(), ConnectionTarget::Primary);
//! ```

use std::future::Future;

use super::context::{RoutedFuture, RoutingContext};
use super::scope::ScopedSelection;
use super::target::ConnectionTarget;

/// 데이터소스 선언
///
/// 선언은 정의 시점에 고정됩니다 (`const`로 만들 수 있음).
/// `UsingDataSource::default()`는 기본 대상을 선언합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UsingDataSource {
    target: ConnectionTarget,
}

impl UsingDataSource {
    /// 대상 선언
    pub const fn new(target: ConnectionTarget) -> Self {
        Self { target }
    }

    /// 선언된 대상
    pub const fn target(&self) -> ConnectionTarget {
        self.target
    }

    /// 동기 연산 실행
    ///
    /// 연산의 반환값(`Result`의 에러 포함)은 그대로 전달되고, 패닉은 복원 후
    /// 다시 전파됩니다.
    pub fn invoke<F, T>(&self, op: F) -> T
    where
        F: FnOnce() -> T,
    {
        tracing::debug!(datasource = %self.target, "data source type is {}", self.target);
        let _selection = ScopedSelection::enter(self.target);
        op()
    }

    /// 비동기 연산 실행
    ///
    /// 반환된 future는 자체 태스크 로컬 슬롯을 가지므로 drop(취소)되어도
    /// 바깥 컨텍스트는 변하지 않습니다.
    pub fn invoke_async<F>(&self, future: F) -> RoutedFuture<F>
    where
        F: Future,
    {
        tracing::debug!(datasource = %self.target, "data source type is {}", self.target);
        RoutingContext::scope(self.target, future)
    }

    /// 동기 함수에 선언을 적용한 새 함수 반환
    pub fn wrap<A, T, F>(self, f: F) -> impl Fn(A) -> T
    where
        F: Fn(A) -> T,
    {
        move |arg| self.invoke(|| f(arg))
    }

    /// 비동기 함수에 선언을 적용한 새 함수 반환
    pub fn wrap_async<A, F, Fut>(self, f: F) -> impl Fn(A) -> RoutedFuture<Fut>
    where
        F: Fn(A) -> Fut,
        Fut: Future,
    {
        move |arg| self.invoke_async(f(arg))
    }
}

impl From<ConnectionTarget> for UsingDataSource {
    fn from(target: ConnectionTarget) -> Self {
        Self::new(target)
    }
}

/// 인라인 대상 선언
///
/// ```rust
/// use multi_datasource::{using_datasource, ConnectionTarget, RoutingContext};
///
/// let target = using_datasource!(Replica2, RoutingContext::get());
/// assert_eq!(target, ConnectionTarget::Replica2);
/// ```
///
/// `async` 블록을 넘기면 `invoke_async`로 감쌉니다.
#[macro_export]
macro_rules! using_datasource {
    ($target:ident, async move { $($body:tt)* }) => {
        $crate::UsingDataSource::new($crate::ConnectionTarget::$target)
            .invoke_async(async move { $($body)* })
    };
    ($target:ident, async { $($body:tt)* }) => {
        $crate::UsingDataSource::new($crate::ConnectionTarget::$target).invoke_async(async { $($body)* })
    };
    ($target:ident, $body:expr) => {
        $crate::UsingDataSource::new($crate::ConnectionTarget::$target).invoke(|| $body)
    };
}
