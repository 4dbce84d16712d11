use crate::resourceids::{resource_id, Segment};

resource_id! {
    /// `/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.Media/videoAnalyzers/{videoAnalyzerName}`
    pub struct VideoAnalyzerId("Video Analyzer") {
        subscription_id,
        resource_group_name,
        video_analyzer_name,
    }
    segments = &[
        Segment::fixed("subscriptions"),
        Segment::subscription_id(),
        Segment::fixed("resourceGroups"),
        Segment::resource_group(),
        Segment::fixed("providers"),
        Segment::provider("Microsoft.Media"),
        Segment::fixed("videoAnalyzers"),
        Segment::user("videoAnalyzerName", "videoAnalyzerValue"),
    ];
}

resource_id! {
    pub struct EdgeModuleId("Edge Module") {
        subscription_id,
        resource_group_name,
        video_analyzer_name,
        edge_module_name,
    }
    segments = &[
        Segment::fixed("subscriptions"),
        Segment::subscription_id(),
        Segment::fixed("resourceGroups"),
        Segment::resource_group(),
        Segment::fixed("providers"),
        Segment::provider("Microsoft.Media"),
        Segment::fixed("videoAnalyzers"),
        Segment::user("videoAnalyzerName", "videoAnalyzerValue"),
        Segment::fixed("edgeModules"),
        Segment::user("edgeModuleName", "edgeModuleValue"),
    ];
}

impl EdgeModuleId {
    pub fn video_analyzer(&self) -> VideoAnalyzerId {
        VideoAnalyzerId::new(
            self.subscription_id.as_str(),
            self.resource_group_name.as_str(),
            self.video_analyzer_name.as_str(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resourceids::ResourceId;

    #[test]
    fn test_edge_module_id() {
        let id = EdgeModuleId::parse(
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Media/videoAnalyzers/va1/edgeModules/edge1",
        )
        .unwrap();
        assert_eq!(id.edge_module_name, "edge1");
        assert_eq!(
            id.video_analyzer().id(),
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Media/videoAnalyzers/va1"
        );
        assert!(VideoAnalyzerId::parse(&id.id()).is_err());
    }
}
