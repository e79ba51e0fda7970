//! Runtime initialization and lifecycle management.
//!
//! Wires every core component from an [`AppConfig`](crate::config::AppConfig) so the server
//! and the CLI construct them the same way.
//!
//! ```no_run
//! use umbra_core::{config::AppConfig, runtime::UmbraRuntime};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!
//!     let runtime = UmbraRuntime::builder().with_config(config).enable_discovery_warmup().build()?;
//!
//!     let upstreams = runtime.upstream_manager();
//!     // ... serve requests ...
//!
//!     runtime.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod components;
pub mod lifecycle;

pub use builder::{RuntimeError, UmbraRuntimeBuilder};
pub use components::UmbraComponents;
pub use lifecycle::UmbraRuntime;
