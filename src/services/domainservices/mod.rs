//! Azure Active Directory Domain Services

pub mod client;
mod domain_service_data_source;
mod domain_service_resource;
pub mod ids;
mod replica_set_resource;

pub use domain_service_data_source::ActiveDirectoryDomainServiceDataSource;
pub use domain_service_resource::ActiveDirectoryDomainServiceResource;
pub use replica_set_resource::ActiveDirectoryDomainServiceReplicaSetResource;

use crate::provider::ServiceRegistration;
use crate::resourceids::IdTemplate;
use std::sync::Arc;

pub fn registration() -> ServiceRegistration {
    ServiceRegistration {
        name: "Domain Services",
        resources: vec![
            Arc::new(ActiveDirectoryDomainServiceResource),
            Arc::new(ActiveDirectoryDomainServiceReplicaSetResource),
        ],
        data_sources: vec![Arc::new(ActiveDirectoryDomainServiceDataSource)],
        id_templates: vec![
            IdTemplate::of::<ids::DomainServiceId>(),
            IdTemplate::of::<ids::DomainServiceReplicaSetId>(),
        ],
    }
}
