//! Provider Module
//!
//! Glue between the plugin protocol and the service adapters.
//!
//! # Module Structure
//!
//! - [`resource`] - `Resource`/`DataSource` traits, timeouts and shared adapter helpers
//! - [`registry`] - Registrations collected from every service
//! - [`server`] - `SdkServer`, serving the typed resources and data sources
//! - [`functions`] - `FunctionServer`, serving the provider functions
//!
//! # Example
//!
//! ```ignore
//! use azurerm_provider::provider::SdkServer;
//!
//! let server = SdkServer::from_registry();
//! let response = server.read_resource(ReadResourceRequest { type_name, current_state }).await;
//! if response.new_state.is_none() {
//!     // the resource has gone and leaves state
//! }
//! ```

pub mod functions;
pub mod registry;
pub mod resource;
pub mod server;

pub use functions::FunctionServer;
pub use registry::ServiceRegistration;
pub use resource::{
    ensure_not_exists, import_as_exists_error, with_timeout, DataSource, Operation, Resource, Timeouts,
};
pub use server::SdkServer;

use crate::azure::ArmClient;
use crate::config::Features;
use crate::locks::NamedLocks;

/// Everything a configured provider hands to its adapters
#[derive(Clone)]
pub struct ProviderContext {
    pub client: ArmClient,
    pub features: Features,
    pub locks: NamedLocks,
}

impl ProviderContext {
    pub fn new(client: ArmClient, features: Features) -> Self {
        Self {
            client,
            features,
            locks: NamedLocks::new(),
        }
    }

    pub fn subscription_id(&self) -> &str {
        &self.client.subscription_id
    }
}
