//! 라우팅 모듈
//!
//! 호출 체인마다 사용할 데이터소스를 선택합니다.
//!
//! # 개요
//!
//! - [`ConnectionTarget`]: 라우팅 가능한 대상의 닫힌 집합 (기본값 `Primary`)
//! - [`ConnectionRegistry`]: 대상별 핸들, 시작 시 한 번 구성
//! - [`RoutingContext`]: 태스크/스레드 로컬 "현재 대상" 슬롯
//! - [`RoutingDataSource`]: 현재 대상을 핸들로 변환
//! - [`ScopedSelection`]: 가드 기반 재정의와 LIFO 복원
//! - [`UsingDataSource`]: 연산에 대상을 선언하는 래퍼
//!
//! # 예시
//!
//! ```rust
//! use multi_datasource::datasource::routing::{
//!     ConnectionRegistry, ConnectionTarget, RoutingDataSource, UsingDataSource,
//! };
//!
//! let registry = ConnectionRegistry::builder()
//!     .with(ConnectionTarget::Primary, "master")?
//!     .with(ConnectionTarget::Replica1, "slave1")?
//!     .with(ConnectionTarget::Replica2, "slave2")?
//!     .build()?;
//! let router = RoutingDataSource::new(registry);
//!
//! // 선언 없음 -> 기본 대상
//! assert_eq!(*router.current_handle()?, "master");
//!
//! // 복제본 1 선언
//! let handle = UsingDataSource::new(ConnectionTarget::Replica1)
//!     .invoke(|| router.current_handle().map(|h| *h))?;
//! assert_eq!(handle, "slave1");
//! # Ok::<(), multi_datasource::DataSourceError>(())
//! ```

mod context;
mod interceptor;
mod registry;
mod router;
mod scope;
mod target;

pub use context::{RoutedFuture, RoutingContext, RoutingSlot, RoutingState};
pub use interceptor::UsingDataSource;
pub use registry::{ConnectionRegistry, ConnectionRegistryBuilder};
pub use router::{RouterMetrics, RoutingDataSource};
pub use scope::ScopedSelection;
pub use target::ConnectionTarget;
