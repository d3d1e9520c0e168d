//! 연결 레지스트리
//!
//! 대상별 핸들을 시작 시 한 번 등록하고 이후에는 읽기 전용으로 사용합니다.

use std::array;
use std::fmt;

use super::super::config::{join_targets, DataSourceProperties, DataSourcesConfig};
use super::super::error::{DataSourceError, DataSourceResult};
use super::super::handle::DataSource;
use super::target::{ConnectionTarget, TARGET_COUNT};

/// 연결 레지스트리
///
/// `build()`를 통과한 레지스트리는 모든 대상에 정확히 하나의 핸들을 가집니다.
/// 생성 이후 변경 API가 없으므로 `H: Sync`이면 잠금 없이 공유할 수 있습니다.
pub struct ConnectionRegistry<H = DataSource> {
    entries: [Option<H>; TARGET_COUNT],
}

impl<H> ConnectionRegistry<H> {
    /// 빌더 시작
    pub fn builder() -> ConnectionRegistryBuilder<H> {
        ConnectionRegistryBuilder::new()
    }

    /// 대상의 핸들 조회
    pub fn resolve(&self, target: ConnectionTarget) -> DataSourceResult<&H> {
        self.entries[target.index()].as_ref().ok_or_else(|| {
            DataSourceError::invariant(format!("No handle registered for {}", target))
        })
    }

    /// 기본 대상의 핸들
    pub fn default_handle(&self) -> DataSourceResult<&H> {
        self.resolve(ConnectionTarget::DEFAULT)
    }

    /// 등록된 대상 목록
    pub fn targets(&self) -> Vec<ConnectionTarget> {
        self.iter().map(|(target, _)| target).collect()
    }

    /// 등록된 핸들 수
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// (대상, 핸들) 순회
    pub fn iter(&self) -> impl Iterator<Item = (ConnectionTarget, &H)> {
        ConnectionTarget::ALL
            .into_iter()
            .zip(self.entries.iter())
            .filter_map(|(target, entry)| entry.as_ref().map(|h| (target, h)))
    }

    /// 설정의 각 대상에 대해 `factory`로 핸들을 만들어 레지스트리 생성
    pub fn from_config_with<F>(config: &DataSourcesConfig, mut factory: F) -> DataSourceResult<Self>
    where
        F: FnMut(ConnectionTarget, &DataSourceProperties) -> DataSourceResult<H>,
    {
        let mut builder = Self::builder();
        for (target, properties) in config.iter() {
            let handle = factory(target, properties)?;
            builder.register(target, handle)?;
        }
        builder.build()
    }
}

impl ConnectionRegistry<DataSource> {
    /// 설정에서 기본 `DataSource` 핸들로 레지스트리 생성
    pub fn from_config(config: &DataSourcesConfig) -> DataSourceResult<Self> {
        Self::from_config_with(config, DataSource::from_properties)
    }
}

impl<H: fmt::Debug> fmt::Debug for ConnectionRegistry<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

// ============================================================================
// ConnectionRegistryBuilder - 레지스트리 빌더
// ============================================================================

/// 레지스트리 빌더 (시작 단계 전용)
#[derive(Debug)]
pub struct ConnectionRegistryBuilder<H = DataSource> {
    entries: [Option<H>; TARGET_COUNT],
}

impl<H> ConnectionRegistryBuilder<H> {
    /// 빈 빌더 생성
    pub fn new() -> Self {
        Self {
            entries: array::from_fn(|_| None),
        }
    }

    /// 핸들 등록 (중복 등록은 설정 에러)
    pub fn register(&mut self, target: ConnectionTarget, handle: H) -> DataSourceResult<&mut Self> {
        let slot = &mut self.entries[target.index()];
        if slot.is_some() {
            return Err(DataSourceError::configuration(format!(
                "Duplicate datasource registration for {}",
                target
            )));
        }
        *slot = Some(handle);
        Ok(self)
    }

    /// 체이닝용 등록
    pub fn with(mut self, target: ConnectionTarget, handle: H) -> DataSourceResult<Self> {
        self.register(target, handle)?;
        Ok(self)
    }

    /// 아직 등록되지 않은 대상
    pub fn missing_targets(&self) -> Vec<ConnectionTarget> {
        ConnectionTarget::ALL
            .into_iter()
            .filter(|t| self.entries[t.index()].is_none())
            .collect()
    }

    /// 레지스트리 생성 (모든 대상이 등록되어 있어야 함)
    pub fn build(self) -> DataSourceResult<ConnectionRegistry<H>> {
        let missing = self.missing_targets();
        if !missing.is_empty() {
            return Err(DataSourceError::configuration(format!(
                "No datasource registered for {}",
                join_targets(&missing)
            )));
        }

        tracing::info!(
            targets = TARGET_COUNT,
            default = %ConnectionTarget::DEFAULT,
            "datasource registry initialized"
        );

        Ok(ConnectionRegistry {
            entries: self.entries,
        })
    }
}

impl<H> Default for ConnectionRegistryBuilder<H> {
    fn default() -> Self {
        Self::new()
    }
}
