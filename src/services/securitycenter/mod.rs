//! Security Center

mod automation_resource;
pub mod client;
pub mod ids;

pub use automation_resource::SecurityCenterAutomationResource;

use crate::provider::ServiceRegistration;
use crate::resourceids::IdTemplate;
use std::sync::Arc;

pub fn registration() -> ServiceRegistration {
    ServiceRegistration {
        name: "Security Center",
        resources: vec![Arc::new(SecurityCenterAutomationResource)],
        data_sources: Vec::new(),
        id_templates: vec![IdTemplate::of::<ids::AutomationId>()],
    }
}
