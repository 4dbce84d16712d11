//! Azure Resource Manager provider
//!
//! Typed resource IDs, CRUD adapters for a set of ARM services and a
//! protocol mux that fronts several provider servers as one.
//!
//! # Module Structure
//!
//! - [`resourceids`] - Parse, format and normalise ARM resource IDs
//! - [`azure`] - Authentication, HTTP and long-running-operation polling
//! - [`provider`] - Resource/data source traits, registry and the SDK server
//! - [`services`] - Per-service clients and adapters
//! - [`mux`] - Routes protocol calls across embedded servers
//!
//! # Example
//!
//! ```ignore
//! use azurerm_provider::mux::MuxServer;
//! use azurerm_provider::provider::{FunctionServer, SdkServer};
//! use std::sync::Arc;
//!
//! let mux = MuxServer::new(vec![
//!     Arc::new(SdkServer::from_registry()),
//!     Arc::new(FunctionServer::new()),
//! ]);
//! let schema = mux.get_provider_schema().await;
//! ```

pub mod azure;
pub mod config;
pub mod diagnostics;
pub mod helpers;
pub mod locks;
pub mod mux;
pub mod protocol;
pub mod provider;
pub mod resourceids;
pub mod schema;
pub mod services;
pub mod state;

/// Version injected at compile time via AZURERM_PROVIDER_VERSION (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("AZURERM_PROVIDER_VERSION") {
    Some(v) => v,
    None => "dev",
};
