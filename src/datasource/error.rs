//! DataSource Error Types
//!
//! 데이터소스 라우팅 에러 정의

use thiserror::Error;

// ============================================================================
// DataSourceError - 데이터소스 에러
// ============================================================================

/// 데이터소스 에러
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataSourceError {
    /// 설정 에러 (시작 시 치명적)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 내부 불변식 위반
    #[error("Internal invariant violation: {0}")]
    InternalInvariantViolation(String),

    /// 알 수 없는 대상
    #[error("Unknown connection target: {0}")]
    UnknownTarget(String),

    /// 닫힌 라우터 사용
    #[error("Closed: {0}")]
    Closed(String),
}

impl DataSourceError {
    /// 설정 에러 생성
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// 내부 불변식 위반 에러 생성
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InternalInvariantViolation(msg.into())
    }

    /// 알 수 없는 대상 에러 생성
    pub fn unknown_target(name: impl Into<String>) -> Self {
        Self::UnknownTarget(name.into())
    }

    /// 닫힘 에러 생성
    pub fn closed(msg: impl Into<String>) -> Self {
        Self::Closed(msg.into())
    }

    /// 프로세스 시작을 중단해야 하는 에러인지 여부
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::UnknownTarget(_) | Self::InternalInvariantViolation(_)
        )
    }
}

// ============================================================================
// Result Type
// ============================================================================

/// 데이터소스 결과 타입
pub type DataSourceResult<T> = Result<T, DataSourceError>;

// ============================================================================
// Tests
// ============================================================================
