//! Azure Resource Manager API Module
//!
//! Provides the REST layer every service client is built on.
//!
//! # Module Structure
//!
//! - [`auth`] - Access tokens (static, client secret, Azure CLI) with caching
//! - [`client`] - Main ARM client with CRUD verbs, paging and LRO polling
//! - [`environment`] - Cloud endpoints (public, US government, China)
//! - [`http`] - HTTP wrapper with typed error decoding
//! - [`operation`] - Long-running operation status tracking
//!
//! # Example
//!
//! ```ignore
//! use azurerm_provider::azure::{ArmClient, AzureCredentials, CloudEnvironment};
//!
//! let env = CloudEnvironment::public();
//! let client = ArmClient::new(AzureCredentials::azure_cli(&env, None), env, "0000-...")?;
//! let group: serde_json::Value = client.get("/subscriptions/0000-.../resourceGroups/rg", "2021-04-01").await?;
//! ```

pub mod auth;
pub mod client;
pub mod environment;
pub mod http;
pub mod operation;

pub use auth::AzureCredentials;
pub use client::ArmClient;
pub use environment::CloudEnvironment;
pub use http::{format_arm_error, ArmError};
