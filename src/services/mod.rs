//! Service packages
//!
//! Each service contributes a [`ServiceRegistration`] with its resources,
//! data sources and resource ID templates. The registry collects them once
//! at startup.

pub mod advisor;
pub mod analysisservices;
pub mod domainservices;
pub mod hsm;
pub mod securitycenter;
pub mod videoanalyzer;

use crate::provider::ServiceRegistration;

/// All service registrations, in a stable order
pub fn registrations() -> Vec<ServiceRegistration> {
    vec![
        advisor::registration(),
        analysisservices::registration(),
        domainservices::registration(),
        hsm::registration(),
        securitycenter::registration(),
        videoanalyzer::registration(),
    ]
}
