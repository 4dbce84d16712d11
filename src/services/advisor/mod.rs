//! Advisor

pub mod client;
mod recommendations_data_source;

pub use recommendations_data_source::{build_filter, AdvisorRecommendationsDataSource};

use crate::provider::ServiceRegistration;
use std::sync::Arc;

pub fn registration() -> ServiceRegistration {
    ServiceRegistration {
        name: "Advisor",
        resources: Vec::new(),
        data_sources: vec![Arc::new(AdvisorRecommendationsDataSource)],
        id_templates: Vec::new(),
    }
}
