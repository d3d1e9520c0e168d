//! DataSource Handle
//!
//! 대상별로 미리 준비된 불투명 연결 핸들

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::config::{Credentials, DataSourceProperties, ServerAddress};
use super::error::DataSourceResult;
use super::routing::ConnectionTarget;

/// 핸들 ID 생성기
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// 데이터소스 핸들
///
/// 라우터가 반환하는 값입니다. 실제 연결 풀과 SQL 실행은 데이터 접근 계층의
/// 몫이며, 이 타입은 어떤 I/O도 수행하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    /// 핸들 ID
    id: u64,
    /// 연결 대상
    target: ConnectionTarget,
    /// 서버 주소
    address: ServerAddress,
    /// 인증 정보
    credentials: Credentials,
    /// 최대 연결 수
    max_pool_size: usize,
    /// 연결 타임아웃
    connection_timeout: Duration,
}

impl DataSource {
    /// 설정에서 핸들 생성
    pub fn from_properties(target: ConnectionTarget, properties: &DataSourceProperties) -> DataSourceResult<Self> {
        properties.validate()?;
        Ok(Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            target,
            address: properties.address()?,
            credentials: properties.credentials(),
            max_pool_size: properties.max_pool_size,
            connection_timeout: properties.connection_timeout(),
        })
    }

    /// 핸들 ID (프로세스 내 유일)
    pub fn id(&self) -> u64 {
        self.id
    }

    /// 연결 대상
    pub fn target(&self) -> ConnectionTarget {
        self.target
    }

    /// 서버 주소
    pub fn address(&self) -> &ServerAddress {
        &self.address
    }

    /// 인증 정보
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// 최대 연결 수
    pub fn max_pool_size(&self) -> usize {
        self.max_pool_size
    }

    /// 연결 타임아웃
    pub fn connection_timeout(&self) -> Duration {
        self.connection_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datasource_from_properties() {
        let props = DataSourceProperties::builder("mysql://db-slave1:3306/app")
            .with_credentials("reader", "pw")
            .with_max_pool_size(5)
            .build();

        let ds = DataSource::from_properties(ConnectionTarget::Replica1, &props).unwrap();
        assert_eq!(ds.target(), ConnectionTarget::Replica1);
        assert_eq!(ds.address().host, "db-slave1");
        assert_eq!(ds.credentials().username(), Some("reader"));
        assert_eq!(ds.max_pool_size(), 5);
        assert_eq!(ds.connection_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_datasource_ids_unique() {
        let props = DataSourceProperties::new("mysql://db/app");
        let a = DataSource::from_properties(ConnectionTarget::Primary, &props).unwrap();
        let b = DataSource::from_properties(ConnectionTarget::Primary, &props).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_datasource_invalid_properties() {
        let props = DataSourceProperties::new("nonsense");
        assert!(DataSource::from_properties(ConnectionTarget::Primary, &props).is_err());
    }
}
