//! 라우터
//!
//! 현재 라우팅 컨텍스트를 레지스트리 핸들로 변환합니다.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::super::error::{DataSourceError, DataSourceResult};
use super::super::handle::DataSource;
use super::context::RoutingContext;
use super::registry::ConnectionRegistry;
use super::target::{ConnectionTarget, TARGET_COUNT};

/// 라우팅 데이터소스
///
/// 데이터 접근 계층은 연산마다 [`current_handle`](Self::current_handle)을
/// 호출해야 합니다. 결과는 캐시되지 않으므로 호출 체인 도중 대상이 바뀌면
/// 다음 연산부터 반영됩니다.
pub struct RoutingDataSource<H = DataSource> {
    /// 연결 레지스트리
    registry: Arc<ConnectionRegistry<H>>,
    /// 대상별 조회 횟수
    resolutions: [AtomicU64; TARGET_COUNT],
    /// 열린 상태
    open: RwLock<bool>,
}

impl<H> RoutingDataSource<H> {
    /// 새 라우터 생성
    pub fn new(registry: ConnectionRegistry<H>) -> Self {
        Self::from_shared(Arc::new(registry))
    }

    /// 공유 레지스트리로 라우터 생성
    pub fn from_shared(registry: Arc<ConnectionRegistry<H>>) -> Self {
        Self {
            registry,
            resolutions: std::array::from_fn(|_| AtomicU64::new(0)),
            open: RwLock::new(true),
        }
    }

    /// 현재 호출 체인의 대상
    pub fn current_target(&self) -> ConnectionTarget {
        RoutingContext::get()
    }

    /// 현재 호출 체인이 사용할 핸들
    pub fn current_handle(&self) -> DataSourceResult<&H> {
        self.handle_for(RoutingContext::get())
    }

    /// 지정한 대상의 핸들
    pub fn handle_for(&self, target: ConnectionTarget) -> DataSourceResult<&H> {
        self.ensure_open()?;
        let handle = self.registry.resolve(target)?;
        self.resolutions[target.index()].fetch_add(1, Ordering::Relaxed);
        tracing::trace!(datasource = %target, "resolved datasource");
        Ok(handle)
    }

    /// 레지스트리
    pub fn registry(&self) -> &ConnectionRegistry<H> {
        &self.registry
    }

    /// 공유 레지스트리
    pub fn shared_registry(&self) -> Arc<ConnectionRegistry<H>> {
        self.registry.clone()
    }

    /// 라우터 닫기 (이후 조회는 실패)
    pub fn close(&self) {
        let mut open = self.open.write();
        if *open {
            *open = false;
            tracing::info!("routing datasource closed");
        }
    }

    /// 열린 상태 여부
    pub fn is_open(&self) -> bool {
        *self.open.read()
    }

    /// 메트릭 조회
    pub fn metrics(&self) -> RouterMetrics {
        RouterMetrics {
            resolutions: std::array::from_fn(|i| self.resolutions[i].load(Ordering::Relaxed)),
        }
    }

    /// 열린 상태 확인
    fn ensure_open(&self) -> DataSourceResult<()> {
        if *self.open.read() {
            Ok(())
        } else {
            Err(DataSourceError::closed("Routing datasource is closed"))
        }
    }
}

impl<H: fmt::Debug> fmt::Debug for RoutingDataSource<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingDataSource")
            .field("registry", &self.registry)
            .field("open", &self.is_open())
            .finish()
    }
}

// ============================================================================
// RouterMetrics - 라우터 메트릭
// ============================================================================

/// 라우터 메트릭
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouterMetrics {
    resolutions: [u64; TARGET_COUNT],
}

impl RouterMetrics {
    /// 대상별 조회 횟수
    pub fn resolutions(&self, target: ConnectionTarget) -> u64 {
        self.resolutions[target.index()]
    }

    /// 총 조회 횟수
    pub fn total(&self) -> u64 {
        self.resolutions.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::routing::ScopedSelection;

    fn router() -> RoutingDataSource<&'static str> {
        let mut builder = ConnectionRegistry::builder();
        builder.register(ConnectionTarget::Primary, "master").unwrap();
        builder.register(ConnectionTarget::Replica1, "slave1").unwrap();
        builder.register(ConnectionTarget::Replica2, "slave2").unwrap();
        RoutingDataSource::new(builder.build().unwrap())
    }

    #[test]
    fn test_current_handle_default() {
        let router = router();
        assert_eq!(router.current_target(), ConnectionTarget::Primary);
        assert_eq!(*router.current_handle().unwrap(), "master");
    }

    #[test]
    fn test_current_handle_follows_context() {
        let router = router();

        RoutingContext::set(ConnectionTarget::Replica2);
        assert_eq!(*router.current_handle().unwrap(), "slave2");

        // 캐시되지 않음
        RoutingContext::set(ConnectionTarget::Replica1);
        assert_eq!(*router.current_handle().unwrap(), "slave1");

        RoutingContext::clear();
        assert_eq!(*router.current_handle().unwrap(), "master");
    }

    #[test]
    fn test_current_handle_with_selection() {
        let router = router();
        {
            let _selection = ScopedSelection::enter(ConnectionTarget::Replica1);
            assert_eq!(*router.current_handle().unwrap(), "slave1");
        }
        assert_eq!(*router.current_handle().unwrap(), "master");
    }

    #[test]
    fn test_handle_for() {
        let router = router();
        assert_eq!(*router.handle_for(ConnectionTarget::Replica2).unwrap(), "slave2");
        // 컨텍스트는 바뀌지 않음
        assert_eq!(router.current_target(), ConnectionTarget::Primary);
    }

    #[test]
    fn test_metrics() {
        let router = router();
        router.current_handle().unwrap();
        router.current_handle().unwrap();
        router.handle_for(ConnectionTarget::Replica2).unwrap();

        let metrics = router.metrics();
        assert_eq!(metrics.resolutions(ConnectionTarget::Primary), 2);
        assert_eq!(metrics.resolutions(ConnectionTarget::Replica1), 0);
        assert_eq!(metrics.resolutions(ConnectionTarget::Replica2), 1);
        assert_eq!(metrics.total(), 3);
    }

    #[test]
    fn test_close() {
        let router = router();
        assert!(router.is_open());

        router.close();
        router.close();
        assert!(!router.is_open());

        let err = router.current_handle().unwrap_err();
        assert!(matches!(err, DataSourceError::Closed(_)));
        assert_eq!(router.metrics().total(), 0);
    }

    #[test]
    fn test_shared_across_threads() {
        let router = Arc::new(router());

        let handles: Vec<_> = ConnectionTarget::ALL
            .into_iter()
            .map(|target| {
                let router = router.clone();
                std::thread::spawn(move || {
                    let _selection = ScopedSelection::enter(target);
                    router.current_handle().map(|h| *h)
                })
            })
            .collect();

        let seen: Vec<_> = handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect();
        assert_eq!(seen, vec!["master", "slave1", "slave2"]);
        assert_eq!(router.metrics().total(), 3);
    }
}
