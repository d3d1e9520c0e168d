//! DataSource Module
//!
//! 주/복제본 데이터소스 동적 라우팅
//!
//! # 구성
//!
//! - 설정 (`DataSourcesConfig`, `DataSourceProperties`)
//! - 핸들 (`DataSource`)
//! - 라우팅 (`routing`): 레지스트리, 컨텍스트, 라우터, 범위 선택, 인터셉터
//!
//! # Example
//!
//! ```rust
//! use multi_datasource::datasource::{
//!     ConnectionRegistry, ConnectionTarget, DataSourcesConfig, RoutingDataSource, UsingDataSource,
//! };
//!
//! let config = DataSourcesConfig::from_properties_str(
//!     "datasource.master.url=mysql://db-master:3306/app\n\
//!      datasource.slave.url=mysql://db-slave1:3306/app\n\
//!      datasource.slave2.url=mysql://db-slave2:3306/app",
//! )?;
//! config.validate()?;
//!
//! let router = RoutingDataSource::new(ConnectionRegistry::from_config(&config)?);
//!
//! let host = UsingDataSource::new(ConnectionTarget::Replica2)
//!     .invoke(|| router.current_handle().map(|ds| ds.address().host.clone()))?;
//! assert_eq!(host, "db-slave2");
//! # Ok::<(), multi_datasource::DataSourceError>(())
//! ```

pub mod routing;
mod config;
mod error;
mod handle;

// Re-exports
pub use config::{
    Credentials, DataSourceProperties, DataSourcePropertiesBuilder, DataSourcesConfig, ServerAddress,
};
pub use error::{DataSourceError, DataSourceResult};
pub use handle::DataSource;
pub use routing::{
    ConnectionRegistry, ConnectionRegistryBuilder, ConnectionTarget, RoutedFuture, RouterMetrics,
    RoutingContext, RoutingDataSource, RoutingSlot, RoutingState, ScopedSelection, UsingDataSource,
};
