//! Key Vault Managed Hardware Security Modules

pub mod client;
pub mod ids;
mod managed_hsm_resource;

pub use managed_hsm_resource::KeyVaultManagedHardwareSecurityModuleResource;

use crate::provider::ServiceRegistration;
use crate::resourceids::IdTemplate;
use std::sync::Arc;

pub fn registration() -> ServiceRegistration {
    ServiceRegistration {
        name: "Managed HSM",
        resources: vec![Arc::new(KeyVaultManagedHardwareSecurityModuleResource)],
        data_sources: Vec::new(),
        id_templates: vec![
            IdTemplate::of::<ids::ManagedHsmId>(),
            IdTemplate::of::<ids::DeletedManagedHsmId>(),
        ],
    }
}
