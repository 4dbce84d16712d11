//! Analysis Services

pub mod client;
pub mod ids;
mod server_resource;

pub use server_resource::AnalysisServicesServerResource;

use crate::provider::ServiceRegistration;
use crate::resourceids::IdTemplate;
use std::sync::Arc;

pub fn registration() -> ServiceRegistration {
    ServiceRegistration {
        name: "Analysis Services",
        resources: vec![Arc::new(AnalysisServicesServerResource)],
        data_sources: Vec::new(),
        id_templates: vec![IdTemplate::of::<ids::ServerId>()],
    }
}
