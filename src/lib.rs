//! # Multi DataSource
//!
//! Dynamic primary/replica datasource routing for Rust services.
//!
//! ## Features
//!
//! - **Closed target set** - `Primary`, `Replica1`, `Replica2` with `Primary` as the default
//! - **Per call chain selection** - thread-local for sync code, task-local for async code
//! - **Scoped overrides** - guard based selection, restored in LIFO order on every exit path
//! - **Declarative routing** - attach a target to an operation with [`UsingDataSource`] or [`using_datasource!`]
//! - **Startup configuration** - builder, serde, or `datasource.<target>.<field>` properties
//!
//! ## Quick Start
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! multi-datasource = "0.1"
//! tokio = { version = "1", features = ["full"] }
//! ```
//!
//! ## Basic Usage
//!
//! ```rust
//! use multi_datasource::{
//!     ConnectionRegistry, ConnectionTarget, DataSourceProperties, DataSourcesConfig,
//!     RoutingDataSource, using_datasource,
//! };
//!
//! # fn main() -> Result<(), multi_datasource::DataSourceError> {
//! let config = DataSourcesConfig::new()
//!     .with_source(ConnectionTarget::Primary, DataSourceProperties::new("postgres://master/app"))
//!     .with_source(ConnectionTarget::Replica1, DataSourceProperties::new("postgres://slave1/app"))
//!     .with_source(ConnectionTarget::Replica2, DataSourceProperties::new("postgres://slave2/app"));
//!
//! let router = RoutingDataSource::new(ConnectionRegistry::from_config(&config)?);
//!
//! // Undeclared operations use the primary
//! assert_eq!(router.current_handle()?.address().host, "master");
//!
//! // Declared operations use the declared target
//! let host = using_datasource!(Replica1, {
//!     router.current_handle().map(|ds| ds.address().host.clone())
//! })?;
//! assert_eq!(host, "slave1");
//! # Ok(())
//! # }
//! ```
//!
//! ## Async Usage
//!
//! Async entry points get their own task-local slot, so concurrent tasks on the
//! same worker thread never observe each other's selection:
//!
//! ```rust,no_run
//! use multi_datasource::{ConnectionTarget, RoutingContext, UsingDataSource};
//!
//! # async fn example() {
//! let read = UsingDataSource::new(ConnectionTarget::Replica2);
//!
//! let target = read
//!     .invoke_async(async {
//!         tokio::task::yield_now().await;
//!         RoutingContext::get()
//!     })
//!     .await;
//! assert_eq!(target, ConnectionTarget::Replica2);
//!
//! // Propagate the current selection into a spawned task
//! let child = tokio::spawn(RoutingContext::inherit(async { RoutingContext::get() }));
//! # let _ = child.await;
//! # }
//! ```
//!
//! ## Scoped Selection
//!
//! ```rust
//! use multi_datasource::{ConnectionTarget, RoutingContext, ScopedSelection};
//!
//! {
//!     let _selection = ScopedSelection::enter(ConnectionTarget::Replica1);
//!     assert_eq!(RoutingContext::get(), ConnectionTarget::Replica1);
//! }
//! assert_eq!(RoutingContext::get(), ConnectionTarget::Primary);
//! ```
//!
//! ## Configuration
//!
//! Properties may carry an optional `spring.` prefix:
//!
//! ```rust
//! use multi_datasource::{ConnectionTarget, DataSourcesConfig};
//!
//! let config = DataSourcesConfig::from_properties_str(
//!     "# primary\n\
//!      spring.datasource.master.url=jdbc:mysql://db-master/app\n\
//!      spring.datasource.master.username=app\n\
//!      spring.datasource.slave.url=jdbc:mysql://db-slave1/app\n\
//!      spring.datasource.slave2.url=jdbc:mysql://db-slave2/app\n",
//! )
//! .unwrap();
//!
//! assert!(config.validate().is_ok());
//! assert_eq!(
//!     config.get(ConnectionTarget::Primary).and_then(|p| p.username.as_deref()),
//!     Some("app")
//! );
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return [`DataSourceResult`]:
//!
//! ```rust
//! use multi_datasource::{ConnectionRegistry, DataSourceError};
//!
//! let result = ConnectionRegistry::<u32>::builder().build();
//!
//! match result {
//!     Ok(_) => println!("Ready"),
//!     Err(DataSourceError::Configuration(msg)) => eprintln!("Bad configuration: {}", msg),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```
//!
//! ## Modules
//!
//! - [`datasource`] - Configuration, handles, and routing
//! - [`datasource::routing`] - Targets, context, registry, router, scoped selection
//!

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod datasource;

// Re-exports for convenience
pub use datasource::{
    ConnectionRegistry, ConnectionRegistryBuilder, ConnectionTarget,
    Credentials, DataSource, DataSourceProperties, DataSourcePropertiesBuilder, DataSourcesConfig,
    DataSourceError, DataSourceResult,
    RoutedFuture, RouterMetrics, RoutingContext, RoutingDataSource, RoutingSlot, RoutingState,
    ScopedSelection, ServerAddress, UsingDataSource,
};
