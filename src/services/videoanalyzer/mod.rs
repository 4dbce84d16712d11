//! Video Analyzer

pub mod client;
mod edge_module_resource;
pub mod ids;
mod video_analyzer_resource;

pub use edge_module_resource::VideoAnalyzerEdgeModuleResource;
pub use video_analyzer_resource::VideoAnalyzerResource;

use crate::provider::ServiceRegistration;
use crate::resourceids::IdTemplate;
use std::sync::Arc;

pub fn registration() -> ServiceRegistration {
    ServiceRegistration {
        name: "Video Analyzer",
        resources: vec![Arc::new(VideoAnalyzerResource), Arc::new(VideoAnalyzerEdgeModuleResource)],
        data_sources: Vec::new(),
        id_templates: vec![
            IdTemplate::of::<ids::VideoAnalyzerId>(),
            IdTemplate::of::<ids::EdgeModuleId>(),
        ],
    }
}
